//! Command bodies behind the vsstore binary that produce data rather than
//! terminal text. The binary only parses arguments, opens the image and prints.

pub mod report;
