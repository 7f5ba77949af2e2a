use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
};
use log::{ info, debug };

use thiserror::Error;



///
/// Errors which may occur when opening or draining the disassembly.
///
#[derive(Error, Debug)]
pub enum InputError
{
        #[error("could not read listing {path:?}: {source}")]
        Listing { path: PathBuf, source: io::Error },

        #[error("could not start `{program}`: {source}")]
        Spawn { program: String, source: io::Error },

        #[error("`{program}` gave no output stream")]
        NoStdout { program: String },

        #[error("`{program}` failed with {status}")]
        Disassembler { program: String, status: ExitStatus },

        #[error("waiting for `{program}` failed: {source}")]
        Wait { program: String, source: io::Error },
}



enum Source
{
    Stdin(io::StdinLock<'static>),
    File(BufReader<File>),
    Child { program: String, child: Child, stdout: BufReader<ChildStdout> },
}

///
/// A line oriented disassembly stream: either a saved `objdump -d` listing
/// or the standard output of a disassembler spawned on the binary.
///
/// Reading from a spawned disassembler blocks until it has produced output,
/// so a slow start only delays the analysis.
///
pub struct Disassembly
{
    source: Source,
}

impl Disassembly
{
    /// Open a saved listing; `-` reads standard input.
    pub fn open_listing(path: &Path) -> Result<Self, InputError>
    {
        if path == Path::new("-")
        {
            info!("reading listing from stdin");
            return Ok(Disassembly { source: Source::Stdin(io::stdin().lock()) });
        }

        let file = File::open(path).map_err(|source|
                        InputError::Listing { path: path.to_path_buf(), source })?;
        info!("reading listing {:?}", path);
        Ok(Disassembly { source: Source::File(BufReader::new(file)) })
    }

    /// Run `<program> -d <binary>` and read its standard output.
    pub fn spawn(program: &str, binary: &Path) -> Result<Self, InputError>
    {
        debug!("running `{} -d {:?}`", program, binary);
        let mut child = Command::new(program)
            .arg("-d")
            .arg(binary)
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| InputError::Spawn { program: program.to_string(), source })?;

        let stdout = child.stdout.take()
            .ok_or_else(|| InputError::NoStdout { program: program.to_string() })?;

        Ok(Disassembly
        {
            source: Source::Child
            {
                program:    program.to_string(),
                child:      child,
                stdout:     BufReader::new(stdout),
            },
        })
    }

    pub fn reader(&mut self) -> &mut dyn BufRead
    {
        match &mut self.source
        {
            Source::Stdin(lock)             => lock as &mut dyn BufRead,
            Source::File(reader)            => reader,
            Source::Child { stdout, .. }    => stdout,
        }
    }

    /// Reap the disassembler, if any. A failing disassembler makes the
    /// listing that was read suspect, so that is an error too.
    pub fn finish(self) -> Result<(), InputError>
    {
        if let Source::Child { program, mut child, stdout } = self.source
        {
            drop(stdout);
            let status = child.wait()
                .map_err(|source| InputError::Wait { program: program.clone(), source })?;
            if !status.success()
            {
                return Err(InputError::Disassembler { program, status });
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn missing_listing_is_reported()
    {
        let err = Disassembly::open_listing(Path::new("/nonexistent/firmware.lst")).err().unwrap();
        assert!(matches!(err, InputError::Listing { .. }));
    }

    #[test]
    fn missing_disassembler_is_reported()
    {
        let err = Disassembly::spawn("no-such-objdump-binary", Path::new("firmware.elf")).err().unwrap();
        match err
        {
            InputError::Spawn { program, .. } => assert_eq!(program, "no-such-objdump-binary"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
