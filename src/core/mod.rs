/*!
The `core` module is for types and concepts that are *not* strictly related to XMI *files*.
These types and concepts could be used for realtime MIDI as well.
!*/

pub(crate) mod command;
pub(crate) mod numbers;

pub use command::XmiCommand;
pub use numbers::{Channel, U14, U7};
