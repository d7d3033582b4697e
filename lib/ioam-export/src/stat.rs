// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Named counters exposed by a dataplane node.
//!
//! A node declares its counters as a struct of [`StatU64`] fields and
//! derives [`StatProvider`]. The derive produces a plain snapshot type
//! and the ordered table of counter names and descriptions that the
//! node registers with its host.
use alloc::boxed::Box;
use alloc::string::String;
use alloc::string::ToString;
use core::fmt;
use core::fmt::Display;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;

pub use stat_macro::StatProvider;

/// The maximum length of a registered module or provider name.
pub const STAT_STRLEN: usize = 31;

/// The name and description of a single counter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatField {
    pub name: &'static str,
    pub desc: &'static str,
}

/// A provider of named counters.
///
/// Rather than implementing this trait manually, the stat-macro
/// should be used.
///
/// # Example
///
/// To declare a new provider simply define a struct of named fields
/// with type [`StatU64`] and derive [`StatProvider`].
///
/// ```ignore
/// #[derive(StatProvider)]
/// struct SomeStats {
///     /// Packets seen
///     pkts: StatU64,
///     /// Packets dropped for lack of a buffer
///     no_buffer: StatU64,
/// }
/// ```
///
/// To update the values use [`StatU64::incr`], which only needs a
/// shared reference, so a provider may be updated from several
/// workers at once.
///
/// ```ignore
/// stats.no_buffer.incr(1);
/// ```
///
/// To register a provider see [`StatNamed`].
pub trait StatProvider {
    const NUM_FIELDS: u32;

    /// The name and description of each counter, in declaration order.
    const FIELDS: &'static [StatField];

    type Snap;

    fn new() -> Self;

    fn num_fields(&self) -> u32 {
        Self::NUM_FIELDS
    }

    /// Return a snapshot of the stats. This is how you obtain a copy,
    /// as opposed to the traditional clone().
    fn snapshot(&self) -> Self::Snap;

    /// Return the current value of the counter at position `idx` of
    /// [`Self::FIELDS`].
    fn value(&self, idx: usize) -> Option<u64>;
}

/// A registered [`StatProvider`].
///
/// The provider is registered under a `module` and `name` pair, for
/// example `("ioam", "ip6-export")`. This should be called **exactly**
/// once for a given node instance.
///
/// ```ignore
/// #[derive(StatProvider)]
/// pub struct MyStats {
///     /// Some counter
///     my_counter: StatU64,
/// }
///
/// StatNamed::new("module", "name", MyStats::new())?;
/// ```
pub struct StatNamed<T: StatProvider> {
    module: String,
    name: String,
    pub vals: Box<T>,
}

impl<T: StatProvider> StatNamed<T> {
    pub fn new(
        module: &str,
        name: &str,
        provider: T,
    ) -> Result<StatNamed<T>, Error> {
        check_name(module)?;
        check_name(name)?;

        Ok(Self {
            module: module.to_string(),
            name: name.to_string(),
            vals: Box::new(provider),
        })
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn check_name(name: &str) -> Result<(), Error> {
    if name.contains('\0') {
        return Err(Error::NulChar);
    }

    if name.len() > STAT_STRLEN {
        return Err(Error::NameTooLong(name.to_string()));
    }

    Ok(())
}

/// A 64-bit unsigned named counter.
///
/// Counters are only ever summed and read for reporting, so relaxed
/// ordering is sufficient.
#[derive(Debug, Default)]
pub struct StatU64 {
    value: AtomicU64,
}

impl StatU64 {
    pub const fn new() -> Self {
        Self { value: AtomicU64::new(0) }
    }

    #[inline]
    pub fn incr(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn val(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// A stat registration error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    NameTooLong(String),
    NulChar,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NameTooLong(name) => {
                write!(f, "stat name too long: {}", name)
            }

            Self::NulChar => write!(f, "stat name contains NUL char"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(StatProvider)]
    struct DemoStats {
        /// Packets seen
        pkts: StatU64,
        /// Packets dropped
        /// for lack of a buffer
        no_buffer: StatU64,
    }

    #[test]
    fn derived_fields() {
        assert_eq!(DemoStats::NUM_FIELDS, 2);
        assert_eq!(
            DemoStats::FIELDS,
            &[
                StatField { name: "pkts", desc: "Packets seen" },
                StatField {
                    name: "no_buffer",
                    desc: "Packets dropped for lack of a buffer",
                },
            ]
        );
    }

    #[test]
    fn incr_and_snapshot() {
        let stats = DemoStats::new();
        stats.pkts.incr(2);
        stats.no_buffer.incr(1);

        let snap = stats.snapshot();
        assert_eq!(snap.pkts, 2);
        assert_eq!(snap.no_buffer, 1);
        assert_eq!(stats.value(0), Some(2));
        assert_eq!(stats.value(1), Some(1));
        assert_eq!(stats.value(2), None);
    }

    #[test]
    fn registration_names() {
        let named = StatNamed::new("ioam", "ip6-export", DemoStats::new());
        assert!(named.is_ok());
        let named = named.unwrap();
        assert_eq!(named.module(), "ioam");
        assert_eq!(named.name(), "ip6-export");

        let long = "x".repeat(STAT_STRLEN + 1);
        assert!(matches!(
            StatNamed::new("ioam", &long, DemoStats::new()),
            Err(Error::NameTooLong(_))
        ));
        assert!(matches!(
            StatNamed::new("io\0am", "n", DemoStats::new()),
            Err(Error::NulChar)
        ));
    }
}
