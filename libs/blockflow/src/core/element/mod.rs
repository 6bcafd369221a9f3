// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod element;
mod element_id;
mod io_signature;
mod port;

pub use element::Element;
pub use element_id::ElementId;
pub use io_signature::IoSignature;
pub use port::Port;
