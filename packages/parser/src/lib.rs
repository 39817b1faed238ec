//! # Gridkit Parser
//!
//! Document model for resizable grid layouts plus the structural text
//! format used to describe them:
//!
//! ```text
//! <mainGrid name="Dashboard">
//!   <content>
//!     <row>
//!       <cell type="module" component="Chart" title="Sales"/>
//!       <resizer/>
//!       <cell type="placeholder"/>
//!     </row>
//!   </content>
//! </mainGrid>
//! ```

pub mod ast;
pub mod error;
pub mod id_generator;
pub mod parser;
pub mod serializer;
pub mod tokenizer;
pub mod view;

pub use ast::{Attributes, CellKind, GridDocument, Node, NodeKind, NodeRef};
pub use error::{format_error, ParseError, ParseResult, StructureError};
pub use id_generator::IdGenerator;
pub use parser::{parse, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token, TokenSpan};
pub use view::{GridView, NodeView};
