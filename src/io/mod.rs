//! I/O modules for decoding Level 1.5 native files

pub mod record;
pub mod header;
pub mod trailer;
pub mod channels;
pub mod layout;
pub mod data_block;
pub mod native_reader;

pub use header::FileHeader;
pub use trailer::Trailer;
pub use channels::ChannelSet;
pub use layout::LineLayout;
pub use data_block::{DataBlockView, LineHeader, SubRecord};
pub use native_reader::NativeReader;
