//! Protocol Module
//!
//! The binary request format, the bounded JSON response, and the frames that
//! carry both over a stream.
//!
//! ## Request Buffer
//! ```text
//! ┌────────┬──────────┬────────┬───────┬───────┬────────┬──────────┬────────┐
//! │ OpType │ Capacity │ Length │ DB    │ Table │ PK sec │ Read sec │ Op id  │
//! └────────┴──────────┴────────┴───────┴───────┴────────┴──────────┴────────┘
//!    word 0    word 1    word 2  ...                                 word 7
//! ```
//! Eight little-endian u32 words; words 3..=7 are byte offsets from the start
//! of the buffer. A zero read-section or op-id offset means "absent".
//!
//! ### Sections
//! - PK section: `[count][pair-offset]*`, each pair is `[name-off][value-off]`
//! - Read section: `[count][name-off]*`
//! - Names are NUL-terminated UTF-8
//! - Values are `[len (2, LE)][bytes]`
//!
//! ## Response Document
//! ```text
//! {"operationId":"<id>","Data":{"<col>":<value>,...}}\0
//! ```

pub mod layout;

mod frame;
mod lookup;
mod request;
mod response;

pub use frame::{
    decode_batch_response, decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, FrameOp, RequestFrame, ResponseCode,
    ResponseFrame, FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use lookup::{Filter, LookupRequest};
pub use request::{PkValue, RequestView};
pub use response::ResponseBuilder;
