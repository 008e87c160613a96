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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
/// 切片后 HTML 的默认字节上限
pub const DEFAULT_MAX_HTML_SIZE: usize = 75_000;
const DEFAULT_COMMAND: &str = "wkhtmltoimage";
const DEFAULT_TEMP_DIR: &str = "tmp";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 60;
const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9000";

fn default_user_agent() -> String {
    format!("capturs/{}", env!("CARGO_PKG_VERSION"))
}

/// 应用程序配置设置
///
/// 包含服务器、抓取、转换和指标等所有配置项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 抓取配置
    pub fetch: FetchSettings,
    /// 转换配置
    pub converter: ConverterSettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 抓取配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    /// 出站请求超时时间（秒），覆盖连接到读取完响应体的全过程
    pub timeout_secs: u64,
    /// 切片后 HTML 的字节上限
    pub max_html_size: usize,
    /// 出站请求的 User-Agent
    pub user_agent: String,
}

/// 转换配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterSettings {
    /// 渲染程序，从 PATH 中查找
    pub command: String,
    /// 位于 `--format png` 之前的参数，`command` 为启动器（如 xvfb-run）时使用
    pub wrapper_args: Vec<String>,
    /// 临时文件目录，必须在处理请求前存在
    pub temp_dir: PathBuf,
    /// 渲染超时时间（秒）
    pub timeout_secs: u64,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启动 Prometheus 导出器
    pub enabled: bool,
    /// 导出器监听地址
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_html_size: DEFAULT_MAX_HTML_SIZE,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            wrapper_args: Vec::new(),
            temp_dir: PathBuf::from(DEFAULT_TEMP_DIR),
            timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: DEFAULT_METRICS_ADDR.to_string(),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次叠加内置默认值、`config/default`、`config/<APP_ENVIRONMENT>`
    /// 以及 `CAPTURS__` 前缀的环境变量（例如 `CAPTURS__SERVER__PORT=9090`）。
    /// `CAPTURS__CONVERTER__WRAPPER_ARGS` 以空格分隔。
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            // Default fetch settings
            .set_default("fetch.timeout_secs", DEFAULT_FETCH_TIMEOUT_SECS as i64)?
            .set_default("fetch.max_html_size", DEFAULT_MAX_HTML_SIZE as i64)?
            .set_default("fetch.user_agent", default_user_agent())?
            // Default converter settings
            .set_default("converter.command", DEFAULT_COMMAND)?
            .set_default("converter.wrapper_args", Vec::<String>::new())?
            .set_default("converter.temp_dir", DEFAULT_TEMP_DIR)?
            .set_default("converter.timeout_secs", DEFAULT_RENDER_TIMEOUT_SECS as i64)?
            // Default metrics settings
            .set_default("metrics.enabled", false)?
            .set_default("metrics.listen_addr", DEFAULT_METRICS_ADDR)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CAPTURS")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("converter.wrapper_args"),
            );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
