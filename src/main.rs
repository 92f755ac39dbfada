//! rscategorizer 命令行入口

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rscategorizer::{
    read_records, write_partitioned, BatchOrchestrator, Category, ConfigManager, GlobalConfig,
    ProvenanceMode, ResponseCategorizer, RuleCacheManager, RuleLoader, RuleTable,
};

#[derive(Parser)]
#[command(name = "rscategorizer")]
#[command(author, version, about = "按有序规则表对大模型回答分类", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 对记录文件分类并按分类写出
    Categorize {
        /// 输入记录文件（JSON数组）
        #[arg(short, long)]
        input: PathBuf,

        /// 输出目录
        #[arg(short, long)]
        output_dir: PathBuf,

        /// 规则表文件（JSON / MessagePack），缺省使用内置规则
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// 并发度
        #[arg(short, long)]
        workers: Option<usize>,

        /// 溯源字段写入展开后的模式串
        #[arg(long)]
        expanded_provenance: bool,
    },

    /// 加载并编译规则表
    Validate {
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// 规则表打包为MessagePack快照
    Pack {
        #[arg(short, long)]
        rules: PathBuf,

        /// 快照输出路径，缺省为配置中的快照路径
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("rscategorizer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rscategorizer=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn build_config(verbose: bool, rules: Option<PathBuf>) -> GlobalConfig {
    let mut builder = ConfigManager::custom().verbose(verbose);
    if let Some(path) = rules {
        builder = builder.rule_file(path);
    }
    builder.build()
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Categorize {
            input,
            output_dir,
            rules,
            workers,
            expanded_provenance,
        } => {
            let mut config = build_config(cli.verbose, rules);
            if let Some(workers) = workers {
                config.worker_count = workers;
            }
            if expanded_provenance {
                config.provenance = ProvenanceMode::Expanded;
            }
            cmd_categorize(&config, &input, &output_dir).await
        }
        Commands::Validate { rules } => cmd_validate(&build_config(cli.verbose, rules)).await,
        Commands::Pack { rules, output } => cmd_pack(&rules, output).await,
    }
}

async fn cmd_categorize(config: &GlobalConfig, input: &Path, output_dir: &Path) -> Result<()> {
    let categorizer = ResponseCategorizer::new(config.clone())
        .await
        .context("分类器初始化失败")?;
    let orchestrator = BatchOrchestrator::new(Arc::new(categorizer), config);

    let records = read_records(input)
        .await
        .with_context(|| format!("读取记录文件失败：{}", input.display()))?;
    let batch = orchestrator.categorize_parallel(records).await?;

    for skipped in &batch.skipped {
        info!("跳过记录#{}：{}", skipped.index, skipped.reason);
    }
    write_partitioned(output_dir, &batch, &config.record_fields)
        .await
        .with_context(|| format!("写出分类结果失败：{}", output_dir.display()))?;
    Ok(())
}

async fn cmd_validate(config: &GlobalConfig) -> Result<()> {
    let table = RuleLoader::load(config).await.context("规则表加载失败")?;
    let categorizer = ResponseCategorizer::from_table(&table, config).context("规则表校验失败")?;

    let compiled = categorizer.rules();
    let dynamic = compiled.rules.iter().filter(|r| r.depends_on_prompt()).count();
    info!("✅ 规则表有效：共{}条，依赖prompt的{}条", compiled.len(), dynamic);
    print_category_counts(&table);
    Ok(())
}

async fn cmd_pack(rules: &Path, output: Option<PathBuf>) -> Result<()> {
    let config = ConfigManager::custom().rule_file(rules).build();
    let table = RuleLoader::load(&config).await.context("规则表加载失败")?;
    // 打包前先确认规则表可编译
    ResponseCategorizer::from_table(&table, &config).context("规则表校验失败")?;

    let output = output.unwrap_or(config.rule_cache_path);
    RuleCacheManager::save_to_path(&output, &table)
        .await
        .with_context(|| format!("写入规则快照失败：{}", output.display()))?;
    info!("📦 规则快照已写入 {}，规则数：{}", output.display(), table.len());
    Ok(())
}

fn print_category_counts(table: &RuleTable) {
    for category in Category::all() {
        info!("  {}：{}条", category, table.count_by_category(category));
    }
}
