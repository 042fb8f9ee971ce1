use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};

use aql_optimizer::config::{ClusterConfig, Config};
use aql_optimizer::query::optimizer::QueryOptions;
use aql_optimizer::query::planner::plan::ExecutionPlan;
use aql_optimizer::query::planner::rewrite::RuleRegistry;
use aql_optimizer::query::QueryEngine;
use aql_optimizer::storage::{Dataset, MemoryStorage};
use aql_optimizer::utils::logging;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "AQL Optimizer Contributors")]
struct Cli {
    /// 配置文件，不存在时使用默认配置
    #[clap(short, long, default_value = "aqlopt.toml")]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 优化计划并输出 explain 结果
    Explain(QueryArgs),
    /// 优化并执行计划
    Execute(QueryArgs),
    /// 列出内置规则
    Rules,
}

#[derive(Args)]
struct QueryArgs {
    /// JSON 格式的初始执行计划
    #[clap(short, long)]
    plan: PathBuf,

    /// JSON 格式的数据集（集合、文档、索引）
    #[clap(short, long)]
    dataset: Option<PathBuf>,

    /// 查询选项 JSON 文件
    #[clap(short, long)]
    options: Option<PathBuf>,

    /// 绑定参数 JSON 文件
    #[clap(short, long)]
    bind: Option<PathBuf>,

    /// 规则开关，例如 `-all,+use-indexes`
    #[clap(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    rules: Vec<String>,

    /// 输出全部候选计划
    #[clap(long)]
    all_plans: bool,

    /// 以集群模式优化，指定分片数
    #[clap(long)]
    shards: Option<usize>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("无法读取 {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("无法解析 {}", path.display()))
}

fn load_config(path: &Path, shards: Option<usize>) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path).map_err(|e| anyhow::anyhow!("无法加载配置 {}: {}", path.display(), e))?
    } else {
        Config::default()
    };
    if let Some(shards) = shards {
        config.optimizer.cluster = ClusterConfig::with_shards(shards);
    }
    Ok(config)
}

struct Prepared {
    engine: QueryEngine,
    plan: ExecutionPlan,
    options: QueryOptions,
    bind_vars: Map<String, Value>,
}

fn prepare(args: &QueryArgs, config: Config) -> Result<Prepared> {
    let storage = match &args.dataset {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("无法读取 {}", path.display()))?;
            Dataset::from_json(&text)
                .with_context(|| format!("无法解析数据集 {}", path.display()))?
                .into_storage(Duration::from_millis(config.executor.lock_timeout_ms))?
        }
        None => MemoryStorage::with_lock_timeout(Duration::from_millis(config.executor.lock_timeout_ms)),
    };

    let mut options: QueryOptions = match &args.options {
        Some(path) => read_json(path)?,
        None => QueryOptions::default(),
    };
    if !args.rules.is_empty() {
        options.optimizer.rules = args.rules.clone();
    }
    options.all_plans |= args.all_plans;

    let bind_vars = match &args.bind {
        Some(path) => read_json(path)?,
        None => Map::new(),
    };

    Ok(Prepared {
        engine: QueryEngine::new(Arc::new(storage), config),
        plan: read_json(&args.plan)?,
        options,
        bind_vars,
    })
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Explain(args) => {
            let config = load_config(&cli.config, args.shards)?;
            let prepared = prepare(&args, config)?;
            let result = prepared.engine.explain_with_bind_vars(
                prepared.plan,
                &prepared.bind_vars,
                &prepared.options,
            )?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Execute(args) => {
            let config = load_config(&cli.config, args.shards)?;
            let prepared = prepare(&args, config)?;
            let result = prepared
                .engine
                .execute(prepared.plan, &prepared.bind_vars, &prepared.options)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Rules => {
            let registry = RuleRegistry::default();
            let rules: Vec<Value> = registry
                .iter()
                .map(|def| {
                    json!({
                        "name": def.name(),
                        "pass": def.pass.name(),
                        "enabledByDefault": def.default_enabled,
                        "clusterOnly": def.cluster_only,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config, None)?;
    if let Err(e) = logging::init(&config.log) {
        eprintln!("日志初始化失败: {}", e);
    }

    let result = run(cli);
    logging::shutdown();
    result
}
