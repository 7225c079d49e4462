//------------------------------------------------------------------------------
//
// Copyright 2025 Jiri Bobek. All rights reserved.
// License: GPL 3.0 or later. See LICENSE.txt for details.
//
//------------------------------------------------------------------------------

use crate::ErrPack;

//--------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
	/// The document is neither a plain value nor carries an `optimizer` identifier.
	MissingIdentifier,

	/// The identifier is registered, but the document does not decode as that optimizer.
	DataCorrupted,
}

impl DecodeError {
	#[cold]
	#[inline(never)]
	pub fn missing_identifier() -> ErrPack<Self> {
		ErrPack::new(
			Self::MissingIdentifier,
			"The data is not a plain value and has no `optimizer` identifier",
		)
	}

	#[cold]
	#[inline(never)]
	pub fn data_corrupted(identifier: &str, nested: Option<serde_json::Error>) -> ErrPack<Self> {
		let message = format!("The data can not be decoded as {identifier}");
		match nested {
			Some(err) => ErrPack::with_nested(Self::DataCorrupted, message, err),
			None => ErrPack::new(Self::DataCorrupted, message),
		}
	}
}

impl From<serde_json::Error> for ErrPack<DecodeError> {
	#[cold]
	#[inline(never)]
	fn from(err: serde_json::Error) -> Self {
		Self::with_nested(DecodeError::DataCorrupted, "Invalid document", err)
	}
}

//--------------------------------------------------------------------------------------------------
