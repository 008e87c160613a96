// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::settings::ConverterSettings;

const ID_MIN: u32 = 10_000_000;
const ID_MAX: u32 = 99_999_999;

/// 转换错误类型
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to write input file {}: {source}", .path.display())]
    WriteInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch renderer `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("renderer exited with {status}: {stderr}")]
    RenderFailed { status: ExitStatus, stderr: String },

    #[error("renderer did not finish within {0:?}")]
    Timeout(Duration),
}

/// HTML 到 PNG 的转换器
///
/// 每个请求独占一个转换器及其两个临时文件
/// `<temp_dir>/input<ID>.html` 和 `<temp_dir>/output<ID>.png`。
/// 转换器被丢弃时总会清理这两个文件，包括提前返回和 panic 展开的情况。
#[derive(Debug)]
pub struct Converter {
    html: Bytes,
    id: String,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl Converter {
    /// 将 HTML 渲染为 PNG
    ///
    /// 分配唯一 ID，写入输入文件，然后调用外部渲染程序：
    /// `<command> [wrapper_args...] --format png <input> <output>`。
    ///
    /// # 参数
    ///
    /// * `html` - 待渲染的 HTML
    /// * `settings` - 转换配置
    ///
    /// # 返回值
    ///
    /// * `Ok(Converter)` - 渲染成功，输出文件位于 [`Converter::output_path`]
    /// * `Err(ConvertError)` - 写入或渲染失败，此时临时文件已被清理
    pub async fn convert(html: Bytes, settings: &ConverterSettings) -> Result<Self, ConvertError> {
        let converter = Self::reserve(html, &settings.temp_dir).await?;
        info!(id = %converter.id, "Converter allocated");
        converter.html_to_image(settings).await?;
        Ok(converter)
    }

    /// 生成 8 位十进制随机 ID
    ///
    /// 使用线程本地、由操作系统熵源播种一次的 CSPRNG，
    /// 连续快速调用之间不会因为时间种子相同而重复。
    pub fn generate_id() -> String {
        rand::rng().random_range(ID_MIN..=ID_MAX).to_string()
    }

    /// 由临时目录和 ID 推导输入、输出文件路径
    pub fn paths_for(temp_dir: &Path, id: &str) -> (PathBuf, PathBuf) {
        (
            temp_dir.join(format!("input{}.html", id)),
            temp_dir.join(format!("output{}.png", id)),
        )
    }

    /// 分配未被占用的 ID 并写入输入文件
    async fn reserve(html: Bytes, temp_dir: &Path) -> Result<Self, ConvertError> {
        Self::reserve_with(html, temp_dir, Self::generate_id).await
    }

    /// 从 `next_id` 依次取 ID，直到输入、输出文件都不存在
    async fn reserve_with(
        html: Bytes,
        temp_dir: &Path,
        mut next_id: impl FnMut() -> String,
    ) -> Result<Self, ConvertError> {
        loop {
            let id = next_id();
            let (input_path, output_path) = Self::paths_for(temp_dir, &id);

            if exists(&input_path).await || exists(&output_path).await {
                debug!(id = %id, "Temp id in use, drawing another");
                continue;
            }

            // create_new makes the reservation atomic across in-flight requests
            let file = match open_exclusive(&input_path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(id = %id, "Temp id taken concurrently, drawing another");
                    continue;
                }
                Err(source) => {
                    return Err(ConvertError::WriteInput {
                        path: input_path,
                        source,
                    })
                }
            };

            let converter = Self {
                html,
                id,
                input_path,
                output_path,
            };
            converter.write_input(file).await?;
            return Ok(converter);
        }
    }

    async fn write_input(&self, mut file: File) -> Result<(), ConvertError> {
        let result = async {
            file.write_all(&self.html).await?;
            file.flush().await
        }
        .await;

        result.map_err(|source| ConvertError::WriteInput {
            path: self.input_path.clone(),
            source,
        })
    }

    async fn html_to_image(&self, settings: &ConverterSettings) -> Result<(), ConvertError> {
        let mut command = Command::new(&settings.command);
        command
            .args(&settings.wrapper_args)
            .arg("--format")
            .arg("png")
            .arg(&self.input_path)
            .arg(&self.output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Launchers such as xvfb-run fork the real renderer; a fresh group lets us kill both
        #[cfg(unix)]
        command.process_group(0);

        debug!(
            id = %self.id,
            command = %settings.command,
            input = %self.input_path.display(),
            output = %self.output_path.display(),
            "Running renderer"
        );

        let child = command.spawn().map_err(|source| ConvertError::Spawn {
            command: settings.command.clone(),
            source,
        })?;
        // Dropped on deadline or cancellation, which kills the whole group
        let group = ProcessGroupGuard::new(child.id());

        let deadline = Duration::from_secs(settings.timeout_secs);
        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| ConvertError::Timeout(deadline))?
            .map_err(|source| ConvertError::Spawn {
                command: settings.command.clone(),
                source,
            })?;
        group.disarm();

        if !output.status.success() {
            return Err(ConvertError::RenderFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    /// 删除输入和输出临时文件
    ///
    /// 先检查存在再删除，错误只记录不返回。可重复调用。
    /// 这是同步的文件系统调用，`Drop` 中无法 await；
    /// 在异步上下文中优先使用 [`Converter::release`]。
    pub fn cleanup(&self) {
        for path in [&self.input_path, &self.output_path] {
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(path) {
                Ok(()) => debug!(id = %self.id, path = %path.display(), "Removed temp file"),
                Err(e) => warn!(
                    id = %self.id,
                    path = %path.display(),
                    error = %e,
                    "Failed to remove temp file"
                ),
            }
        }
    }

    /// 在阻塞线程池上丢弃转换器并清理临时文件
    pub async fn release(self) {
        let id = self.id.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || drop(self)).await {
            warn!(id = %id, error = %e, "Temp file cleanup task failed");
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn html(&self) -> &Bytes {
        &self.html
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Drop for Converter {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// 渲染进程组守卫
///
/// 未调用 [`ProcessGroupGuard::disarm`] 就被丢弃时，向整个进程组发送 SIGKILL，
/// 避免启动器派生的孙进程在清理之后继续写输出文件。
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal to the group created by process_group(0)
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        debug!(pgid, "Killed renderer process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

async fn exists(path: &Path) -> bool {
    matches!(fs::try_exists(path).await, Ok(true))
}

async fn open_exclusive(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o644);
    options.open(path).await
}
