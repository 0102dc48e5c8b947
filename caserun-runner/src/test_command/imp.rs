// Copyright (c) The caserun Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ChildFdError, ChildStartError},
    test_output::ChildOutput,
};
use bytes::BytesMut;
use std::{io, process::Stdio, sync::Arc};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Child as TokioChild,
};

/// A spawned child process along with the read end of its output pipe.
pub(crate) struct Child {
    pub(crate) child: TokioChild,
    pub(crate) child_acc: ChildAccumulator,
}

pub(super) fn spawn(mut cmd: std::process::Command) -> Result<Child, ChildStartError> {
    cmd.stdin(Stdio::null());

    let (rx, tx) = io::pipe().map_err(|error| ChildStartError::PipeCreate(Arc::new(error)))?;
    let tx_dup = tx
        .try_clone()
        .map_err(|error| ChildStartError::PipeCreate(Arc::new(error)))?;
    cmd.stdout(tx).stderr(tx_dup);

    let mut cmd: tokio::process::Command = cmd.into();
    let child = cmd
        .spawn()
        .map_err(|error| ChildStartError::Spawn(Arc::new(error)))?;

    // The command holds our copies of the write end. Drop them so that the read end sees EOF
    // once the child and its descendants are done with it.
    drop(cmd);

    let file = File::from_std(pipe_reader_to_file(rx));
    Ok(Child {
        child,
        child_acc: ChildAccumulator::new(file),
    })
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn pipe_reader_to_file(rx: io::PipeReader) -> std::fs::File {
            std::fs::File::from(std::os::fd::OwnedFd::from(rx))
        }
    } else if #[cfg(windows)] {
        fn pipe_reader_to_file(rx: io::PipeReader) -> std::fs::File {
            std::fs::File::from(std::os::windows::io::OwnedHandle::from(rx))
        }
    } else {
        compile_error!("unsupported target platform");
    }
}

/// The size of the reader's buffer, and the size at which the output buffer grows.
const CHUNK_SIZE: usize = 4 * 1024;

/// A `BufReader` that remembers whether it has reached end of file or failed.
struct FusedBufReader<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> FusedBufReader<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(CHUNK_SIZE, reader),
            done: false,
        }
    }

    async fn fill_buf(&mut self, acc: &mut BytesMut) -> Result<(), io::Error> {
        if self.done {
            return Ok(());
        }

        match self.reader.fill_buf().await {
            Ok(buf) => {
                acc.extend_from_slice(buf);
                if buf.is_empty() {
                    self.done = true;
                }
                let len = buf.len();
                self.reader.consume(len);
                Ok(())
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }
}

/// Collects the combined output of a child process.
///
/// Progress is made one [`fill_buf`](Self::fill_buf) call at a time, so that the executor can
/// race reading against waiting on the child and the deadline.
pub(crate) struct ChildAccumulator {
    reader: FusedBufReader<File>,
    buf: BytesMut,
    error: Option<ChildFdError>,
}

impl ChildAccumulator {
    fn new(file: File) -> Self {
        Self {
            reader: FusedBufReader::new(file),
            buf: BytesMut::with_capacity(CHUNK_SIZE),
            error: None,
        }
    }

    /// Returns true once end of file was reached or reading failed.
    pub(crate) fn is_done(&self) -> bool {
        self.reader.done
    }

    /// Reads the next chunk of available output.
    ///
    /// This is cancel-safe, since [`AsyncBufReadExt::fill_buf`] is cancel-safe.
    pub(crate) async fn fill_buf(&mut self) {
        if let Err(error) = self.reader.fill_buf(&mut self.buf).await {
            self.error = Some(ChildFdError::ReadCombined(Arc::new(error)));
        }
    }

    /// Marks collection as done, returning what was read.
    pub(crate) fn freeze(self) -> ChildOutput {
        ChildOutput {
            buf: self.buf.freeze(),
            read_error: self.error,
        }
    }
}
