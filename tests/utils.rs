#![allow(dead_code)]

use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn enable_logging() {
    LOGGER.call_once(|| {
        env_logger::Builder::new()
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{}:{} [{}] - {}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0),
                    record.level(),
                    record.args()
                )
            })
            .filter(None, LevelFilter::Warn)
            .init();
    });
}

/// Wraps an `EVNT` payload in the minimal `FORM XMID ... EVNT <size> <payload>` container that
/// every scenario in the crate's tests builds on.
pub fn form_xmid_evnt(evnt_payload: &[u8]) -> Vec<u8> {
    let mut evnt = Vec::new();
    evnt.extend_from_slice(b"EVNT");
    evnt.extend_from_slice(&(evnt_payload.len() as u32).to_be_bytes());
    evnt.extend_from_slice(evnt_payload);

    let mut form_body = Vec::new();
    form_body.extend_from_slice(b"XMID");
    form_body.extend_from_slice(&evnt);

    let mut out = Vec::new();
    out.extend_from_slice(b"FORM");
    out.extend_from_slice(&(form_body.len() as u32).to_be_bytes());
    out.extend_from_slice(&form_body);
    out
}
