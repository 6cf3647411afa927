pub mod api;
pub mod boxes;
pub mod codec;
pub mod config;
pub mod known_boxes;
pub mod layout;
pub mod parser;
pub mod registry;
pub mod util;

pub use api::{MoovInfo, identify, identify_with, sniff};
pub use boxes::{Atom, AtomBody, AtomFields, BoxHeader, FourCC, find_all_by_path, find_by_path};
pub use codec::{Primitive, Value};
pub use config::ParseOptions;
pub use layout::{DecodeError, Field, FieldMap, read_layout};
pub use parser::{ParseError, Walker, read_box_header, walk};
pub use registry::{BoxDecoder, Registry, default_registry};
