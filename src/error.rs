use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(LibError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

/// The internal Error type for this library. One variant per distinguishable failure mode named
/// in the load-time and stream-time error taxonomy: container-walk failures, decode failures, and
/// the byte-level I/O failures that underlie both.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum LibError {
    #[snafu(display("unable to open '{}': {}", path.display(), source))]
    NotFound {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("error while reading bytes: {}", source))]
    Io {
        site: String,
        source: crate::byte_cursor::CursorError,
    },

    #[snafu(display("{}: container walk found no EVNT chunk", site))]
    NoEvntChunk { site: String },

    #[snafu(display("{}: chunk header or payload runs past end of file: {}", site, description))]
    TruncatedContainer { site: String, description: String },

    #[snafu(display(
        "{}: running status byte encountered before any status byte was seen",
        site
    ))]
    RunningStatusWithoutPrior { site: String },

    #[snafu(display("{}: unrecognized status byte {:#04X}", site, status))]
    UnknownStatus { site: String, status: u8 },

    #[snafu(display("{}: malformed XMI stream: {}", site, description))]
    Malformed { site: String, description: String },
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

macro_rules! io {
    () => {
        crate::error::Io { site: site!() }
    };
}

macro_rules! malformed_s {
    () => {
        crate::error::Malformed {
            site: site!(),
            description: "[no description]",
        }
    };
    ($msg:expr) => {
        crate::error::Malformed {
            site: site!(),
            description: $msg,
        }
    };
    ($fmt:expr, $($arg:expr),+) => {
        crate::error::Malformed {
            site: site!(),
            description: format!($fmt, $($arg),+),
        }
    };
}

macro_rules! malformed_e {
    () => {
        malformed_s!().build()
    };
    ($msg:expr) => {
        malformed_s!($msg).build()
    };
    ($fmt:expr, $($arg:expr),+) => {
        malformed_s!($fmt, $($arg),+).build()
    };
}

macro_rules! malformed_r {
    () => {
        Err(malformed_e!())
    };
    ($msg:expr) => {
        Err(malformed_e!($msg))
    };
    ($fmt:expr, $($arg:expr),+) => {
        Err(malformed_e!($fmt, $($arg),+))
    };
}

macro_rules! malformed {
    () => {
        return malformed_r!();
    };
    ($msg:expr) => {
        return malformed_r!($msg)
    };
    ($fmt:expr, $($arg:expr),+) => {
        return malformed_r!($fmt, $($arg),+)
    };
}

#[test]
fn site_test() {
    let line = line!() + 1;
    let site = site!();
    assert!(site.contains("error.rs"));
    assert!(site.contains(format!("{}", line).as_str()));
}

#[test]
fn malformed_macros_test_no_message() {
    fn foo() -> LibResult<u64> {
        malformed!();
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("malformed XMI stream"));
}

#[test]
fn malformed_macros_test_message() {
    fn foo() -> LibResult<u64> {
        let flerbin = String::from("flerbin");
        malformed!(flerbin);
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("flerbin"));
}

#[test]
fn malformed_macros_test_fmt() {
    fn foo() -> LibResult<u64> {
        malformed!("hello {}, {}", "world", String::from("foo"));
    }
    let result = foo();
    assert!(result.is_err());
    let message = format!("{}", result.err().unwrap());
    assert!(message.as_str().contains("hello world, foo"));
}
