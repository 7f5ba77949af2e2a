use std::io;

use thiserror::Error;



///
/// Fatal problems with the disassembly stream. Once one of these is hit the
/// call graph can't be trusted, so the whole run is aborted.
///
#[derive(Error, Debug)]
pub enum AnalyzeError
{
        #[error("line {line}: malformed function label `{text}`")]
        MalformedLabel { line: usize, text: String },

        #[error("line {line}: listing ends inside `{name}` before any of its instructions")]
        TruncatedFunction { name: String, line: usize },

        #[error("failed to read the disassembly: {0}")]
        Io(#[from] io::Error),
}
