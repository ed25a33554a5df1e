use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// How to launch the supervised process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Prefix for forwarded log lines.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Overrides applied on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl ProcessSpec {
    pub(crate) fn spawn(&self) -> std::io::Result<Child> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!(
            program = %self.program,
            args = ?self.args,
            "Spawning process"
        );

        cmd.spawn()
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Copy the child's stdout and stderr into our log, one event per line.
/// Both pipes are drained until EOF so the child never sees a closed pipe.
pub(crate) fn forward_output(name: &str, child: &mut Child) {
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(name.to_string(), stdout, Stream::Stdout));
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(name.to_string(), stderr, Stream::Stderr));
    }
}

async fn forward_lines<R>(name: String, pipe: R, stream: Stream)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();

    loop {
        match next_line(&mut reader, &mut buf).await {
            Ok(Some(line)) => match stream {
                Stream::Stdout => tracing::info!(process = %name, "[{}] {}", name, line),
                Stream::Stderr => tracing::error!(process = %name, "[{} Error] {}", name, line),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(process = %name, error = %e, "Failed to read process output");
                break;
            }
        }
    }
}

/// Next line without its terminator. Bytes that are not UTF-8 are replaced
/// rather than ending the stream.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    }

    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}
