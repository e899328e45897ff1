//! 命令行前端

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use shared::models::{Check, DiningTable, StatusColor};
use tableside::core::{derive::Fill, floor};
use tableside::{AppConfig, AppContext, AppError, AppPaths, AssignOutcome, AssignSheet, PendingWrite};

/// 餐厅前场协调: 账单分配与状态颜色
#[derive(Parser, Debug)]
#[command(name = "tableside", version, about = "Front-of-house check and table coordination")]
pub struct Cli {
    /// 工作目录 (默认 $TABLESIDE_HOME 或 ./tableside-data)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// sync-server 地址，覆盖配置文件
    #[arg(long, global = true, env = "TABLESIDE_SERVER_URL")]
    server_url: Option<String>,

    /// 使用进程内文档存储 (单机模式)
    #[arg(long, global = true)]
    in_process: bool,

    /// 终端输出全部日志
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the floor plan.
    Tables,
    /// Show all checks.
    Checks,
    /// Assign a check to a table.
    Assign {
        check: u32,
        table: u32,
        /// Move without asking when the check is at another table.
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Unassign a check.
    Unassign { check: u32 },
    /// Unassign every check at a table.
    ClearTable { table: u32 },
    /// Assign several checks to a table in one batch.
    AssignMany {
        table: u32,
        #[arg(required = true)]
        checks: Vec<u32>,
    },
    /// Start of shift: clear all assignments and colors.
    ClearAll,
    /// Set or clear a status color.
    Color {
        #[command(subcommand)]
        target: ColorTarget,
    },
    /// Provision the fixed tables and checks.
    Seed,
    /// Print the floor plan on every change until interrupted.
    Watch,
}

#[derive(Subcommand, Debug)]
enum ColorTarget {
    Check { number: u32, color: ColorChoice },
    Table { number: u32, color: ColorChoice },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ColorChoice {
    Blue,
    Green,
    Purple,
    None,
}

impl ColorChoice {
    fn status(self) -> Option<StatusColor> {
        match self {
            ColorChoice::Blue => Some(StatusColor::Blue),
            ColorChoice::Green => Some(StatusColor::Green),
            ColorChoice::Purple => Some(StatusColor::Purple),
            ColorChoice::None => None,
        }
    }
}

/// 移动确认被拒绝 (未加 --yes)
const EXIT_NEEDS_CONFIRMATION: u8 = 2;

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let paths = AppPaths::new(self.work_dir.clone().unwrap_or_else(AppPaths::default_work_dir));
        paths
            .ensure_dirs()
            .with_context(|| format!("failed to create work dir {}", paths.base().display()))?;
        let _guard = tableside::logging::init(&paths.logs_dir(), self.verbose);

        let mut config = AppConfig::load(&paths.config_file())?;
        if let Some(url) = self.server_url.clone() {
            config.server_url = url;
        }

        let remote = tableside::connect_remote(&paths, &config, self.in_process).await?;
        let ctx = tableside::start_context(&paths, remote).await;

        if let Err(e) = ctx.wait_ready(config.load_timeout()).await {
            tracing::warn!(error = %e, "Initial load incomplete, showing cached state");
        }
        if let Some(error) = ctx.error() {
            eprintln!("warning: {}", error);
        }

        let code = self.command.execute(&ctx).await;
        ctx.flush_cache().await;
        ctx.shutdown();
        code
    }
}

impl Command {
    async fn execute(self, ctx: &AppContext) -> anyhow::Result<ExitCode> {
        match self {
            Command::Tables => print_floor(ctx),
            Command::Checks => print_checks(ctx),
            Command::Assign { check, table, yes } => {
                let check = find_check(ctx, check)?;
                let table = find_table(ctx, table)?;
                if check.is_assigned_to(&table.id) {
                    println!(
                        "Check #{} is already at Table {}",
                        check.check_number, table.table_number
                    );
                    return Ok(ExitCode::SUCCESS);
                }
                let sheet = AssignSheet::open(ctx, check.id.clone())?;
                let write = match sheet.select_table(&table.id)? {
                    AssignOutcome::Assigned(write) | AssignOutcome::Cleared(write) => write,
                    AssignOutcome::NeedsConfirmation(confirmation) => {
                        if !yes {
                            println!("{}", confirmation.prompt());
                            println!("Re-run with --yes to move.");
                            sheet.close();
                            return Ok(ExitCode::from(EXIT_NEEDS_CONFIRMATION));
                        }
                        sheet.confirm_move(confirmation)
                    }
                };
                sheet.close();
                finish(
                    write,
                    format!("Check #{} -> Table {}", check.check_number, table.table_number),
                )
                .await
            }
            Command::Unassign { check } => {
                let check = find_check(ctx, check)?;
                finish(
                    ctx.clear_check(&check.id),
                    format!("Check #{} unassigned", check.check_number),
                )
                .await
            }
            Command::ClearTable { table } => {
                let table = find_table(ctx, table)?;
                finish(
                    ctx.clear_table(&table.id),
                    format!("Table {} cleared", table.table_number),
                )
                .await
            }
            Command::AssignMany { table, checks } => {
                let table = find_table(ctx, table)?;
                let ids = checks
                    .iter()
                    .map(|&n| find_check(ctx, n).map(|c| c.id))
                    .collect::<Result<Vec<_>, _>>()?;
                finish(
                    ctx.assign_multiple_checks_to_table(&ids, &table.id),
                    format!("{} checks -> Table {}", ids.len(), table.table_number),
                )
                .await
            }
            Command::ClearAll => {
                finish(ctx.clear_all_assignments(), "All assignments cleared".to_string()).await
            }
            Command::Color { target } => match target {
                ColorTarget::Check { number, color } => {
                    let check = find_check(ctx, number)?;
                    let write = match color.status() {
                        Some(c) => ctx.set_check_color(&check.id, c),
                        None => ctx.clear_check_color(&check.id),
                    };
                    finish(write, format!("Check #{} color: {:?}", number, color)).await
                }
                ColorTarget::Table { number, color } => {
                    let table = find_table(ctx, number)?;
                    let write = match color.status() {
                        Some(c) => ctx.set_table_color(&table.id, c),
                        None => ctx.clear_table_color(&table.id),
                    };
                    finish(write, format!("Table {} color: {:?}", number, color)).await
                }
            },
            Command::Seed => finish(ctx.seed_provision(), "Seeded tables and checks".to_string()).await,
            Command::Watch => watch(ctx).await,
        }
    }
}

fn find_check(ctx: &AppContext, number: u32) -> Result<Check, AppError> {
    ctx.check_by_number(number)
        .ok_or_else(|| AppError::CheckNotFound(format!("#{}", number)))
}

fn find_table(ctx: &AppContext, number: u32) -> Result<DiningTable, AppError> {
    ctx.table_by_number(number)
        .ok_or_else(|| AppError::TableNotFound(number.to_string()))
}

/// 等待远程结果；本地修改已生效，失败时不回滚
async fn finish(write: PendingWrite, done: String) -> anyhow::Result<ExitCode> {
    let receipt = write
        .await
        .context("remote write failed (local change kept until the next snapshot)")?;
    match receipt.commit_time {
        Some(at) => println!("{} ({} writes, committed {})", done, receipt.writes, at.to_rfc3339()),
        None => println!("{} (nothing to write)", done),
    }
    Ok(ExitCode::SUCCESS)
}

fn fill_text(fill: Fill) -> &'static str {
    match fill {
        Fill::Neutral => "-",
        Fill::Status(color) => color.as_str(),
    }
}

fn print_floor(ctx: &AppContext) -> anyhow::Result<ExitCode> {
    let status = ctx.status();
    let (plan, empty) =
        ctx.read(|state| (floor::floor_plan(state), floor::empty_state(state, &status)));
    if empty {
        println!("No data found. Run `tableside seed` to provision tables and checks.");
        return Ok(ExitCode::SUCCESS);
    }
    for section in plan {
        println!("Section {}", section.name);
        for table in section.tables {
            println!(
                "  Table {:>2}  {:<6}  {}",
                table.table_number,
                fill_text(table.fill),
                table.label
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_checks(ctx: &AppContext) -> anyhow::Result<ExitCode> {
    let grid = ctx.read(floor::checks_grid);
    for check in grid {
        let table = match check.table_number {
            Some(n) => format!("Table {}", n),
            None if check.assigned => "Table ?".to_string(),
            None => String::new(),
        };
        println!(
            "  #{:>3}  {:<6}  {}",
            check.check_number,
            fill_text(check.fill),
            table
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn watch(ctx: &AppContext) -> anyhow::Result<ExitCode> {
    let mut revisions = ctx.subscribe();
    print_floor(ctx)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("---- revision {} ----", *revisions.borrow_and_update());
                print_floor(ctx)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
