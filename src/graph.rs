//! Call graph construction from a stream of classified listing lines.

use std::collections::BTreeMap;
use std::io::BufRead;

use log::{debug, trace};

use crate::classify::{self, Effect, Event};
use crate::error::AnalyzeError;
use crate::{FunctionRecord, Target};

pub const DEFAULT_SECTION_PREFIX: &str = ".text";



///
/// All functions of a listing, in discovery order, plus an index on their
/// start addresses so call targets can be resolved in `O(log n)`.
///
#[derive(Clone, Debug, Default)]
pub struct CallGraph
{
    records:    Vec<FunctionRecord>,
    by_start:   BTreeMap<u64, usize>,
}

impl CallGraph
{
    pub fn from_records(records: Vec<FunctionRecord>) -> Self
    {
        let mut by_start: BTreeMap<u64, usize> = BTreeMap::new();
        for (index, record) in records.iter().enumerate()
        {
            // aliases share a start address; the one holding the body wins,
            // the first one on a tie
            let replace = match by_start.get(&record.start)
            {
                Some(&kept) => records[kept].end < record.end,
                None        => true,
            };
            if replace
            {
                by_start.insert(record.start, index);
            }
        }

        CallGraph { records, by_start }
    }

    pub fn records(&self) -> &[FunctionRecord]
    {
        &self.records
    }

    pub(crate) fn record_mut(&mut self, index: usize) -> &mut FunctionRecord
    {
        &mut self.records[index]
    }

    pub fn by_name(&self, name: &str) -> Option<&FunctionRecord>
    {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize
    {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.records.is_empty()
    }

    /// Index of the function whose `[start, end]` range holds `address`.
    pub fn function_at(&self, address: u64) -> Option<usize>
    {
        let (_, &index) = self.by_start.range(..=address).next_back()?;
        if self.records[index].contains(address)
        {
            Some(index)
        }
        else
        {
            None
        }
    }
}




struct OpenFunction
{
    record:         FunctionRecord,
    label_line:     usize,
    instructions:   usize,
}

///
/// Consumes the listing line by line. Exactly one function is open at any
/// time; it is closed by the next label, the next section header or the end
/// of the stream.
///
pub struct CallGraphBuilder
{
    target:         Target,
    section_prefix: String,
    scanning:       bool,
    open:           Option<OpenFunction>,
    records:        Vec<FunctionRecord>,
}

impl CallGraphBuilder
{
    pub fn new(target: Target) -> Self
    {
        CallGraphBuilder
        {
            target:         target,
            section_prefix: DEFAULT_SECTION_PREFIX.to_string(),
            scanning:       false,
            open:           None,
            records:        vec![],
        }
    }

    /// Analyze sections whose name starts with `prefix` instead of `.text`.
    pub fn with_section_prefix(mut self, prefix: impl Into<String>) -> Self
    {
        self.section_prefix = prefix.into();
        self
    }

    /// Read a whole listing and build its call graph.
    pub fn build<R: BufRead>(mut self, mut reader: R) -> Result<CallGraph, AnalyzeError>
    {
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop
        {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0
            {
                break;
            }
            line_no += 1;

            let line = String::from_utf8_lossy(&buf);
            self.feed_line(line_no, &line)?;
        }

        self.finish()
    }

    pub fn feed_line(&mut self, line_no: usize, line: &str) -> Result<(), AnalyzeError>
    {
        if !self.scanning
        {
            // everything outside of executable sections is skipped unread
            if let Some(name) = classify::section_name(line)
            {
                self.enter_section(name);
            }
            return Ok(());
        }

        if let Some(event) = classify::classify(line, line_no, self.target)?
        {
            self.feed(line_no, event);
        }
        Ok(())
    }

    pub fn feed(&mut self, line_no: usize, event: Event<'_>)
    {
        match event
        {
            Event::SectionBoundary { name } =>
            {
                self.close();
                self.enter_section(name);
            }
            Event::FunctionLabel { address, name } =>
            {
                self.close();
                trace!("function `{}` at {:#x}", name, address);
                self.open = Some(OpenFunction
                {
                    record:         FunctionRecord::new(name, address),
                    label_line:     line_no,
                    instructions:   0,
                });
            }
            Event::Elision =>
            {
                // zero words still belong to the open function
                if let Some(open) = self.open.as_mut()
                {
                    open.instructions += 1;
                }
            }
            Event::Instruction { address, effect } =>
            {
                let open = match self.open.as_mut()
                {
                    Some(open) => open,
                    None       =>
                    {
                        trace!("line {}: {:#x} is not inside any function", line_no, address);
                        return;
                    }
                };

                open.instructions += 1;
                let record = &mut open.record;
                if address > record.end
                {
                    record.end = address;
                }

                match effect
                {
                    Effect::StackGrowth(n)       => record.own_stack = record.own_stack.saturating_add(n),
                    Effect::Transfer { target }  => record.calls.push(target),
                    Effect::Call { target }      =>
                    {
                        if target == record.start
                        {
                            debug!("`{}` calls itself", record.name);
                            record.calls_itself = true;
                            record.in_cycle = true;
                        }
                        record.calls.push(target);
                    }
                    Effect::IndirectCall         => record.has_indirect_call = true,
                    Effect::Return
                    | Effect::Dispatch
                    | Effect::Plain              => {},
                }
            }
        }
    }

    pub fn finish(mut self) -> Result<CallGraph, AnalyzeError>
    {
        if let Some(open) = &self.open
        {
            if open.instructions == 0
            {
                return Err(AnalyzeError::TruncatedFunction
                {
                    name: open.record.name.clone(),
                    line: open.label_line,
                });
            }
        }
        self.close();

        debug!("{} functions discovered", self.records.len());
        Ok(CallGraph::from_records(self.records))
    }

    fn enter_section(&mut self, name: &str)
    {
        self.scanning = name.starts_with(self.section_prefix.as_str());
        trace!("section `{}`: {}", name, if self.scanning { "analyzing" } else { "skipping" });
    }

    // Branches back into the function's own range are loops, not calls.
    // The end address is only known now, so this filtering can't happen
    // any earlier.
    fn close(&mut self)
    {
        if let Some(open) = self.open.take()
        {
            let mut record = open.record;

            let kept = record.calls.iter().filter(|&&t| !record.contains(t)).count();
            let mut calls = Vec::with_capacity(kept);
            calls.extend(record.calls.iter().copied().filter(|&t| !record.contains(t)));
            record.calls = calls;

            self.records.push(record);
        }
    }
}
