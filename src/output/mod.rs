use std::str::FromStr;

use crate::FunctionRecord;

// re-exporting functions
mod top;     pub use top::{rank, TableConf};
mod dot;     pub use dot::DotConf;
mod escaper; pub use escaper::*;

#[derive( PartialEq, Debug, Clone, Copy)]
pub enum OutputFormat {
    Table,
    Dot,
}

impl FromStr for OutputFormat
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s
        {
            "table" | "md" => Ok(OutputFormat::Table),
            "dot"          => Ok(OutputFormat::Dot),
            other          => Err(format!("unknown output format `{}` (expected table or dot)", other)),
        }
    }
}


/// Which figure the report is ordered by.
#[derive( PartialEq, Eq, Debug, Clone, Copy)]
pub enum SortKey {
    Own,
    Deepest,
}

impl SortKey
{
    pub fn of(&self, f: &FunctionRecord) -> u64
    {
        match self
        {
            SortKey::Own     => f.own_stack,
            SortKey::Deepest => f.deepest,
        }
    }
}

impl FromStr for SortKey
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s
        {
            "deepest" | "d" => Ok(SortKey::Deepest),
            "own"     | "o" => Ok(SortKey::Own),
            other           => Err(format!("unknown sort key `{}` (expected deepest or own)", other)),
        }
    }
}


/// How many rows the report has.
#[derive( PartialEq, Eq, Debug, Clone, Copy)]
pub enum Limit {
    Count(usize),
    All,
}

impl FromStr for Limit
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s
        {
            "all" | "-1" => Ok(Limit::All),
            n => match n.parse::<usize>()
            {
                Ok(0) | Err(_) => Err(format!("`{}` is not a row count (positive number, -1 or all)", n)),
                Ok(n)          => Ok(Limit::Count(n)),
            },
        }
    }
}


pub(crate) fn display_name(name: &str, demangle: bool) -> String
{
    if demangle
    {
        // alternate format drops the `::h<hash>` suffix
        format!("{:#}", rustc_demangle::demangle(name))
    }
    else
    {
        name.to_string()
    }
}
