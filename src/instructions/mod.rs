// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shape instruction documents and their validation

mod document;
mod validate;

pub use document::{
    close_to_axis, CombineOp, InstructionDocument, Position, ShapeGeometry, ShapeKind, ShapeSpec,
    ValidatedDocument,
};
pub use validate::{validate, ValidationError, ValidationReason};
