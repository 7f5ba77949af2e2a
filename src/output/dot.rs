use std::{
    collections::HashSet,
    io,
    io::Write as _, // to get write_fmt, granting writeln!
};

use crate::output::display_name;
use crate::output::escaper::Escaper;
use crate::state::State;



impl State
{
    /// Graphviz rendering of the call graph. Functions with indirect calls
    /// are dashed, recursion cycles are drawn as dashed clusters.
    pub fn output_dot(&self, mut writer: impl io::Write, dc: DotConf) -> io::Result<()>
    {
        let records = self.graph.records();

        writeln!(writer, "digraph {{")?;
        writeln!(writer, "    node [fontname={} shape=box]", &dc.font)?;

        for (i, node) in records.iter().enumerate() {
            write!(writer, "    {} [label=\"", i,)?;

            let mut esc = Escaper::new(&mut writer);
            write!(esc, "{}", display_name(&node.name, dc.demangle))?;

            write!(writer, "\\nlocal = {}", node.own_stack)?;

            if node.is_resolved() {
                write!(writer, "\\nmax {}", node.deepest_bound())?;
            }
            write!(writer, "\"")?;

            if node.has_indirect_call {
                write!(writer, " style=dashed")?;
            }

            writeln!(writer, "]")?;
        }

        let mut seen = HashSet::new();
        for (caller, node) in records.iter().enumerate() {
            for &target in &node.calls {
                if let Some(callee) = self.graph.function_at(target) {
                    if seen.insert((caller, callee)) {
                        writeln!(writer, "    {} -> {}", caller, callee)?;
                    }
                }
            }
        }

        for (i, cycle) in self.cycles.iter().enumerate() {
            writeln!(writer, "\n    subgraph cluster_{} {{", i)?;
            writeln!(writer, "        style=dashed")?;
            writeln!(writer, "        fontname={}", &dc.font)?;
            writeln!(writer, "        label=\"SCC{}\"", i)?;

            for node in cycle {
                writeln!(writer, "        {}", node)?;
            }

            writeln!(writer, "    }}")?;
        }

        writeln!(writer, "}}")?;

        Ok(())
    }
}



#[derive(Clone, Debug)]
pub struct DotConf
{
    pub font:       String,
    pub demangle:   bool,
}

impl Default for DotConf
{
    fn default() -> Self
    {
        DotConf
        {
            font:       "monospace".to_string(),
            demangle:   false,
        }
    }
}


#[cfg(test)]
mod tests
{
    use super::*;
    use crate::Target;

    const LISTING: &str = "
Disassembly of section .text:
9d000000 <main>:
9d000000:\t27bdffe8 \taddiu\tsp,sp,-24
9d000004:\t0f400008 \tjal\t9d000020 <ping>
9d000008:\t0f400008 \tjal\t9d000020 <ping>
9d00000c:\t0320f809 \tjalr\tt9
9d000010:\t03e00008 \tjr\tra
9d000020 <ping>:
9d000020:\t27bdfff0 \taddiu\tsp,sp,-16
9d000024:\t0f400010 \tjal\t9d000040 <pong>
9d000028:\t03e00008 \tjr\tra
9d000040 <pong>:
9d000040:\t27bdfff0 \taddiu\tsp,sp,-16
9d000044:\t0f400008 \tjal\t9d000020 <ping>
9d000048:\t03e00008 \tjr\tra
";

    #[test]
    fn nodes_edges_and_clusters()
    {
        let s = State::analyze(Target::Mips32, LISTING.as_bytes()).unwrap();

        let mut out = Vec::new();
        s.output_dot(&mut out, DotConf::default()).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("digraph {\n    node [fontname=monospace shape=box]\n"));
        assert!(out.contains("    0 [label=\"main\\nlocal = 24\\nmax >= 56\" style=dashed]\n"));
        assert!(out.contains("    1 [label=\"ping\\nlocal = 16\\nmax >= 32\"]\n"));
        // duplicate calls become one edge
        assert_eq!(out.matches("    0 -> 1\n").count(), 1);
        assert!(out.contains("    1 -> 2\n"));
        assert!(out.contains("    2 -> 1\n"));
        assert!(out.contains("subgraph cluster_0 {\n        style=dashed\n        fontname=monospace\n        label=\"SCC0\"\n        1\n        2\n    }\n"));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn quoted_names_are_escaped()
    {
        let listing = "Disassembly of section .text:\n9d000000 <say\"hi\">:\n9d000000:\t03e00008 \tjr\tra\n";
        let s = State::analyze(Target::Mips32, listing.as_bytes()).unwrap();

        let mut out = Vec::new();
        s.output_dot(&mut out, DotConf::default()).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("label=\"say\\\"hi\\\"\\nlocal = 0\\nmax = 0\""));
    }
}
