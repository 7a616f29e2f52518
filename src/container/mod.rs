/*!
The `container` module descends the IFF-style `FORM`/`CAT ` chunk hierarchy that wraps an XMI
event stream, locating the `EVNT` chunk's byte range.
!*/

mod walker;

pub(crate) use walker::locate_evnt;
