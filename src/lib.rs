// SPDX-License-Identifier: Apache-2.0

//! Library for generating points inside the unit hypercube that satisfy a
//! set of user-declared inequality constraints, via an adaptive random
//! walk.

pub mod constraints;
pub mod expr;
pub mod expr_parser;
pub mod matrix_io;
pub mod predicate;
pub mod sample;
pub mod validate;
