// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod error;
pub use error::{Error, UnexpectedState};

mod shared;
pub use shared::{StrRead, ValueType};

mod input;
#[cfg(feature = "std")]
pub use input::IoReader;
pub use input::{ChunkReader, Reader};

mod output;
#[cfg(feature = "std")]
pub use output::IoWriter;
pub use output::{SliceWriter, Writer};

mod scanner;

mod escape;

mod number;

mod reader;
pub use reader::{ArrayReader, JsonReader, ObjectReader, ValueRead};

mod writer;
pub use writer::{ArrayWriter, JsonWriter, ObjectWriter, ValueWrite};

mod sealed {
    pub trait Sealed {}
}
