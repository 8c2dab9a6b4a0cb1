// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential generation for managed database workloads.
//!
//! Passwords become live database credentials, so everything here draws from
//! the operating system RNG.

use rand::rngs::OsRng;
use rand::Rng;

use crate::error::ProvisionError;
use crate::types::Credential;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";

/// Identifier codes name managed workloads (`postgres-<code>`), so they stay
/// short and DNS-safe.
const CODE_LENGTH: usize = 8;
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

const PASSWORD_LENGTH: usize = 10;

/// Generate a short identifier code for a managed workload.
///
/// Uniqueness is enforced by the caller checking existence before creating
/// anything; a collision fails the request rather than overwriting.
pub fn generate_identifier_code() -> String {
	let mut rng = OsRng;
	(0..CODE_LENGTH)
		.map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
		.collect()
}

/// Generate a random string of exactly `length` characters drawn from the
/// enabled character classes.
///
/// # Errors
/// Returns `ProvisionError::EmptyAlphabet` when every class is disabled —
/// there is no valid output alphabet and emitting a degenerate secret would
/// be worse than failing.
pub fn generate_password(
	length: usize,
	use_upper: bool,
	use_lower: bool,
	use_digits: bool,
) -> Result<String, ProvisionError> {
	let mut alphabet = Vec::new();
	if use_upper {
		alphabet.extend_from_slice(UPPER);
	}
	if use_lower {
		alphabet.extend_from_slice(LOWER);
	}
	if use_digits {
		alphabet.extend_from_slice(DIGITS);
	}

	if alphabet.is_empty() {
		return Err(ProvisionError::EmptyAlphabet);
	}

	let mut rng = OsRng;
	Ok((0..length)
		.map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
		.collect())
}

impl Credential {
	/// Generate the full credential set for a managed database identified by
	/// `code`.
	pub fn generate(code: &str) -> Result<Self, ProvisionError> {
		Ok(Self {
			code: code.to_string(),
			username: format!("user-{code}"),
			password: generate_password(PASSWORD_LENGTH, true, true, true)?,
		})
	}
}
