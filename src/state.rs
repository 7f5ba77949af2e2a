
/*      ███████╗████████╗ █████╗ ████████╗███████╗       */
/*      ██╔════╝╚══██╔══╝██╔══██╗╚══██╔══╝██╔════╝       */
/*      ███████╗   ██║   ███████║   ██║   █████╗         */
/*      ╚════██║   ██║   ██╔══██║   ██║   ██╔══╝         */
/*      ███████║   ██║   ██║  ██║   ██║   ███████╗       */
/*      ╚══════╝   ╚═╝   ╚═╝  ╚═╝   ╚═╝   ╚══════╝       */
/*     ███████████████████████████████████████████╗      */
/*     ╚══════════════════════════════════════════╝      */

use std::io::BufRead;

use log::{info, warn};

use crate as c; // static-stack-lib
use crate::error::AnalyzeError;
use crate::graph::{CallGraph, CallGraphBuilder, DEFAULT_SECTION_PREFIX};
use crate::resolve::{self, UnresolvedCall};
use crate::Target;


#[derive(Clone, Debug)]
pub struct State
{
    pub target:             Target,
    /// Sections whose name starts with this are analyzed, all others skipped
    pub section_prefix:     String,

    pub graph:              CallGraph,

    pub unresolved:         Vec<UnresolvedCall>,
    pub cycles:             Vec< Vec<usize> >,
}


///
/// The analysis runs in this order:
///
/// ```text
/// load_listing -> resolve_depths -> find_cycles -> output_table / output_dot
/// ```
///
/// Each step only reads what the previous ones produced.
///
impl State
{

    /// All variables initialized to empty/zero values.
    pub fn empty(target: Target) -> Self
    {
        State
        {
            target:             target,
            section_prefix:     DEFAULT_SECTION_PREFIX.to_string(),
            graph:              CallGraph::default(),
            unresolved:         vec![],
            cycles:             vec![],
        }
    }

    /// Run the whole analysis over a listing.
    pub fn analyze<R: BufRead>(target: Target, reader: R) -> Result<Self, AnalyzeError>
    {
        let mut s = State::empty(target);
        s.load_listing(reader)?;
        s.resolve_depths();
        s.find_cycles();
        Ok(s)
    }

    /// Modified fields:
    /// - graph
    pub fn load_listing<R: BufRead>(&mut self, reader: R) -> Result<(), AnalyzeError>
    {
        self.graph = CallGraphBuilder::new(self.target)
            .with_section_prefix(self.section_prefix.as_str())
            .build(reader)?;

        if self.graph.is_empty()
        {
            warn!("no functions found in `{}*` sections", self.section_prefix);
        }
        else
        {
            info!("{} functions found", self.graph.len());
        }
        Ok(())
    }

    /// Modified fields:
    /// - graph (depths)
    /// - unresolved
    pub fn resolve_depths(&mut self)
    {
        self.unresolved = resolve::resolve_all(&mut self.graph);
        if !self.unresolved.is_empty()
        {
            info!("{} call targets could not be resolved", self.unresolved.len());
        }
    }

    /// Modified fields:
    /// - graph (`in_cycle`)
    /// - cycles
    pub fn find_cycles(&mut self)
    {
        self.cycles = resolve::find_cycles(&mut self.graph);
    }

    /// Deepest stack usage over all functions.
    pub fn worst_case(&self) -> Option<c::Max>
    {
        c::max_of(self.graph.records().iter().map(|f| f.deepest_bound()))
    }
}
