//! Wire protocol shared by the xfchess-sync client and the game server.
//!
//! Every message is one JSON text frame of the form
//! `{"event": "<name>", "data": <payload>}`.

pub mod protocol;
