#![allow(clippy::redundant_field_names)]

//! Worst-case stack usage estimation for embedded MIPS binaries.
//!
//! The crate reads the text produced by `objdump -d`, rebuilds every
//! function's frame size and call edges, and propagates the deepest
//! cumulative stack usage along the call graph.
//!
//! ```no_run
//! use std::io::BufReader;
//! use static_stack_lib as ss;
//!
//! let listing = std::fs::File::open("firmware.lst").unwrap();
//! let mut s = ss::State::empty(ss::Target::Mips32);
//! s.load_listing(BufReader::new(listing)).unwrap();
//! s.resolve_depths();
//! s.find_cycles();
//! s.output_table(std::io::stdout().lock(), &ss::output::TableConf::default()).unwrap();
//! ```

pub mod classify;
pub mod error;
pub mod graph;
pub mod input;
pub mod output;
pub mod resolve;
pub mod state;

pub use error::AnalyzeError;
pub use graph::{CallGraph, CallGraphBuilder};
pub use output::{Limit, OutputFormat, SortKey};
pub use resolve::UnresolvedCall;
pub use state::State;









/*      ████████╗ █████╗ ██████╗  ██████╗ ███████╗████████╗       */
/*      ╚══██╔══╝██╔══██╗██╔══██╗██╔════╝ ██╔════╝╚══██╔══╝       */
/*         ██║   ███████║██████╔╝██║  ███╗█████╗     ██║          */
/*         ██║   ██╔══██║██╔══██╗██║   ██║██╔══╝     ██║          */
/*         ██║   ██║  ██║██║  ██║╚██████╔╝███████╗   ██║          */
/*         ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝   ╚═╝          */
/*     ████████████████████████████████████████████████████╗      */
/*     ╚═══════════════════════════════════════════════════╝      */
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Target {
    Mips32,
    Mips64,
}

impl Target
{
    /// Mnemonics that add a signed immediate to a register.
    /// Only `<mnemonic> sp,sp,-N` counts as frame growth.
    pub fn stack_adjust_mnemonics(&self) -> &'static [&'static str]
    {
        match self
        {
            Target::Mips32 => &["addiu"],
            Target::Mips64 => &["daddiu", "addiu"],
        }
    }
}

impl FromStr for Target
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_ascii_lowercase().as_str()
        {
            "mips32" | "mips" | "pic32" => Ok(Target::Mips32),
            "mips64"                    => Ok(Target::Mips64),
            other => Err(format!("unsupported target `{}` (expected mips32 or mips64)", other)),
        }
    }
}












/*      ███████╗██╗   ██╗███╗   ██╗ ██████╗      */
/*      ██╔════╝██║   ██║████╗  ██║██╔════╝      */
/*      █████╗  ██║   ██║██╔██╗ ██║██║           */
/*      ██╔══╝  ██║   ██║██║╚██╗██║██║           */
/*      ██║     ╚██████╔╝██║ ╚████║╚██████╗      */
/*      ╚═╝      ╚═════╝ ╚═╝  ╚═══╝ ╚═════╝      */
/*     ████████████████████████████████████╗     */
/*     ╚═══════════════════════════════════╝     */

/// Where a record is in the depth resolution walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution
{
    #[default]
    Unvisited,
    InProgress,
    Resolved,
}

/// One function discovered in the listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionRecord
{
    pub name:               String,
    /// First address of the function (the label address)
    pub start:              u64,
    /// Last instruction address seen for the function, inclusive
    pub end:                u64,
    /// Sum of all stack pointer decrements inside `start..=end`
    pub own_stack:          u64,
    /// Call and branch targets outside of the function's own range.
    /// Weak references: resolved by address lookup, never by index.
    pub calls:              Vec<u64>,
    pub has_indirect_call:  bool,
    /// A linking call to the function's own start; dropped from `calls`
    /// with the other intra-function targets
    pub calls_itself:       bool,

    pub state:              Resolution,
    /// Only meaningful once `state` is `Resolved`
    pub deepest:            u64,
    /// Set when the function is part of a recursion cycle
    pub in_cycle:           bool,
}

impl FunctionRecord
{
    pub fn new(name: impl Into<String>, start: u64) -> Self
    {
        FunctionRecord
        {
            name:               name.into(),
            start:              start,
            end:                start,
            own_stack:          0,
            calls:              vec![],
            has_indirect_call:  false,
            calls_itself:       false,
            state:              Resolution::Unvisited,
            deepest:            0,
            in_cycle:           false,
        }
    }

    pub fn contains(&self, address: u64) -> bool
    {
        self.start <= address && address <= self.end
    }

    pub fn is_resolved(&self) -> bool
    {
        self.state == Resolution::Resolved
    }

    /// The deepest stack usage, marked as a lower bound when part of the
    /// call tree is unknown (indirect calls) or cut short (recursion).
    pub fn deepest_bound(&self) -> Max
    {
        if self.has_indirect_call || self.in_cycle
        {
            Max::LowerBound(self.deepest)
        }
        else
        {
            Max::Exact(self.deepest)
        }
    }
}













/*      ███╗   ███╗ █████╗ ██╗  ██╗      */
/*      ████╗ ████║██╔══██╗╚██╗██╔╝      */
/*      ██╔████╔██║███████║ ╚███╔╝       */
/*      ██║╚██╔╝██║██╔══██║ ██╔██╗       */
/*      ██║ ╚═╝ ██║██║  ██║██╔╝ ██╗      */
/*      ╚═╝     ╚═╝╚═╝  ╚═╝╚═╝  ╚═╝      */
/*     ████████████████████████████╗     */
/*     ╚═══════════════════════════╝     */
use core::{cmp, fmt};

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Max
{
    Exact(u64),
    LowerBound(u64),
}

pub fn max_of(mut iter: impl Iterator<Item = Max>) -> Option<Max>
{
    iter.next().map(|first| iter.fold(first, max))
}

pub fn max(lhs: Max, rhs: Max) -> Max
{
    match (lhs, rhs)
    {
        (Max::Exact(lhs),      Max::Exact(rhs))      => Max::Exact(cmp::max(lhs, rhs)),
        (Max::Exact(lhs),      Max::LowerBound(rhs)) => Max::LowerBound(cmp::max(lhs, rhs)),
        (Max::LowerBound(lhs), Max::Exact(rhs))      => Max::LowerBound(cmp::max(lhs, rhs)),
        (Max::LowerBound(lhs), Max::LowerBound(rhs)) => Max::LowerBound(cmp::max(lhs, rhs)),
    }
}

impl fmt::Display for Max
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match *self
        {
            Max::Exact(n)      => write!(f, "= {}", n),
            Max::LowerBound(n) => write!(f, ">= {}", n),
        }
    }
}
