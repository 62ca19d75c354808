//! Parses a `backup` directive's value, a host string of the form
//! `[user@]host[:path]`.

use crate::ConfigError;

/// The pieces a host string can supply. Each is `None` when that part was
/// absent from the input, leaving the caller to fall back to an
/// endpoint-block setting or report a missing required value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSpec {
    /// The `user@` portion, if present.
    pub ruser: Option<String>,
    /// The host portion. Any string is accepted, same as `sethostname(3)`.
    pub hostname: Option<String>,
    /// The `:path` portion, if present.
    pub rpath: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    HostOrUser,
    Host,
    Path,
    Done,
}

/// Parse `input` into its user/host/path components.
///
/// Mirrors the original state machine exactly, including accepting control
/// characters nowhere and accepting an entirely empty string (all three
/// fields `None`, left for the caller to fill in from elsewhere).
pub fn parse_host_str(input: &str) -> Result<HostSpec, ConfigError> {
    let mut state = State::Start;
    let mut ruser_end = None;
    let mut host_start = 0usize;
    let mut host_end = None;
    let mut path_start = None;

    let bytes = input.as_bytes();
    let mut i = 0usize;
    loop {
        let c = bytes.get(i).copied();
        match state {
            State::Start => match c {
                None => state = State::Done,
                Some(b':') => {
                    path_start = Some(i + 1);
                    state = State::Path;
                }
                Some(b) if !(b as char).is_ascii_control() => {
                    state = State::HostOrUser;
                }
                Some(_) => return Err(ConfigError::InvalidHostString(input.to_string())),
            },
            State::HostOrUser => match c {
                Some(b'@') => {
                    ruser_end = Some(i);
                    host_start = i + 1;
                    state = State::Host;
                }
                Some(b':') => {
                    host_end = Some(i);
                    path_start = Some(i + 1);
                    state = State::Path;
                }
                None => {
                    host_end = Some(i);
                    state = State::Done;
                }
                Some(b) if !(b as char).is_ascii_control() => {}
                Some(_) => return Err(ConfigError::InvalidHostString(input.to_string())),
            },
            State::Host => match c {
                None => {
                    host_end = Some(i);
                    state = State::Done;
                }
                Some(b':') => {
                    host_end = Some(i);
                    path_start = Some(i + 1);
                    state = State::Path;
                }
                Some(b) if !(b as char).is_ascii_control() => {}
                Some(_) => return Err(ConfigError::InvalidHostString(input.to_string())),
            },
            State::Path => match c {
                None => state = State::Done,
                Some(b) if !(b as char).is_ascii_control() => {}
                Some(_) => return Err(ConfigError::InvalidHostString(input.to_string())),
            },
            State::Done => break,
        }
        if state == State::Done {
            break;
        }
        i += 1;
    }

    if state != State::Done {
        return Err(ConfigError::InvalidHostString(input.to_string()));
    }

    let ruser = ruser_end.map(|end| input[..end].to_string());
    let hostname = host_end.map(|end| input[host_start..end].to_string());
    let rpath = path_start.map(|start| input[start..].to_string());

    Ok(HostSpec {
        ruser,
        hostname,
        rpath,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_parts() {
        let spec = parse_host_str("backup@box1:/home/data").unwrap();
        assert_eq!(spec.ruser.as_deref(), Some("backup"));
        assert_eq!(spec.hostname.as_deref(), Some("box1"));
        assert_eq!(spec.rpath.as_deref(), Some("/home/data"));
    }

    #[test]
    fn hostname_only() {
        let spec = parse_host_str("box1").unwrap();
        assert_eq!(spec.ruser, None);
        assert_eq!(spec.hostname.as_deref(), Some("box1"));
        assert_eq!(spec.rpath, None);
    }

    #[test]
    fn path_only() {
        let spec = parse_host_str(":/data").unwrap();
        assert_eq!(spec.ruser, None);
        assert_eq!(spec.hostname, None);
        assert_eq!(spec.rpath.as_deref(), Some("/data"));
    }

    #[test]
    fn empty_string_is_ok_with_everything_none() {
        let spec = parse_host_str("").unwrap();
        assert_eq!(spec, HostSpec::default());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(parse_host_str("bo\tx1").is_err());
    }

    #[test]
    fn host_and_path_without_user() {
        let spec = parse_host_str("box1:/srv").unwrap();
        assert_eq!(spec.ruser, None);
        assert_eq!(spec.hostname.as_deref(), Some("box1"));
        assert_eq!(spec.rpath.as_deref(), Some("/srv"));
    }
}
