use std::io;

use crate::FunctionRecord;
use crate::output::{display_name, Limit, SortKey};
use crate::state::State;


const NAME_WIDTH:   usize = 50;
const COLUMN_WIDTH: usize = 15;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableConf
{
    pub sort:       SortKey,
    pub limit:      Limit,
    pub demangle:   bool,
}

impl Default for TableConf
{
    fn default() -> Self
    {
        TableConf
        {
            sort:       SortKey::Deepest,
            limit:      Limit::Count(10),
            demangle:   false,
        }
    }
}


///
/// Records ordered by descending `key`, cut to `limit`. The sort is stable:
/// functions with equal figures stay in the order they were discovered, so
/// an unchanged listing always gives the same report.
///
pub fn rank(records: &[FunctionRecord], key: SortKey, limit: Limit) -> Vec<&FunctionRecord>
{
    let mut ranked: Vec<&FunctionRecord> = records.iter().collect();
    ranked.sort_by(|a, b| key.of(b).cmp(&key.of(a)));

    if let Limit::Count(n) = limit
    {
        ranked.truncate(n);
    }
    ranked
}


impl State
{
    /// Markdown table of the ranked functions, ready to be pasted into docs.
    pub fn output_table(&self, mut writer: impl io::Write, conf: &TableConf) -> io::Result<()>
    {
        writeln!(writer)?;
        writeln!(
            writer,
            "|{:<nw$}|{:<cw$}|{:<cw$}|{:<cw$}|",
            "Name", "Own", "Deepest", "Indirect Calls",
            nw = NAME_WIDTH, cw = COLUMN_WIDTH,
        )?;
        writeln!(
            writer,
            "|{}|{}|{}|{}|",
            "-".repeat(NAME_WIDTH),
            "-".repeat(COLUMN_WIDTH),
            "-".repeat(COLUMN_WIDTH),
            "-".repeat(COLUMN_WIDTH),
        )?;

        for f in rank(self.graph.records(), conf.sort, conf.limit)
        {
            writeln!(
                writer,
                "|{:<nw$}|{:<cw$}|{:<cw$}|{:<cw$}|",
                display_name(&f.name, conf.demangle),
                f.own_stack,
                f.deepest,
                if f.has_indirect_call { '*' } else { ' ' },
                nw = NAME_WIDTH, cw = COLUMN_WIDTH,
            )?;
        }
        Ok(())
    }
}
