//! Pursuit Game CLI
//!
//! Text stand-in for a rendering front end: configures a board, solves it,
//! then auto-steps to termination printing the grid after every step.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use pursuit_core::{Cell, Player, PursuitGame};

#[derive(Parser)]
#[command(name = "pursuit_cli")]
#[command(about = "Solve and play a two-agent grid pursuit game", long_about = None)]
struct Cli {
    /// Board width in tiles
    #[arg(long, default_value_t = 5)]
    width: i32,

    /// Board height in tiles
    #[arg(long, default_value_t = 5)]
    height: i32,

    /// Evader start cell, as "x,y"
    #[arg(long, default_value = "0,2")]
    evader: String,

    /// Pursuer start cell, as "x,y"
    #[arg(long, default_value = "4,2")]
    pursuer: String,

    /// Trap cells, each as "x,y"
    #[arg(long = "trap", default_values_t = ["2,1".to_string(), "2,2".to_string()])]
    traps: Vec<String>,

    /// Goal cells, each as "x,y"
    #[arg(long = "goal", default_values_t = ["4,0".to_string(), "4,4".to_string()])]
    goals: Vec<String>,

    /// Sampling seed (same seed = same run)
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Stop after this many steps even without a winner
    #[arg(long, default_value_t = 200)]
    max_steps: usize,

    /// Print JSON snapshots instead of ASCII boards
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_cell(s: &str) -> Result<Cell> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("expected \"x,y\", got {s:?}"))?;
    Ok(Cell::new(
        x.trim().parse().with_context(|| format!("bad x in {s:?}"))?,
        y.trim().parse().with_context(|| format!("bad y in {s:?}"))?,
    ))
}

fn parse_cells(items: &[String]) -> Result<Vec<Cell>> {
    items.iter().map(|s| parse_cell(s)).collect()
}

fn render(game: &PursuitGame) -> String {
    let evader = game.evader_cell();
    let pursuer = game.pursuer_cell();
    let mut out = String::new();
    // y grows northward; print the top row first.
    for y in (0..game.grid().height()).rev() {
        for x in 0..game.grid().width() {
            let cell = Cell::new(x, y);
            let glyph = if cell == evader && cell == pursuer {
                'X'
            } else if cell == evader {
                'E'
            } else if cell == pursuer {
                'P'
            } else if game.traps().contains(&cell) {
                'T'
            } else if game.goals().contains(&cell) {
                'G'
            } else {
                '.'
            };
            out.push(glyph);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}

fn policy_label(game: &PursuitGame, player: Player) -> String {
    game.policy_in_use(player).map(|k| k.to_string()).unwrap_or_else(|| "-".to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut game = PursuitGame::with_seed(
        cli.width,
        cli.height,
        parse_cell(&cli.evader)?,
        parse_cell(&cli.pursuer)?,
        cli.seed,
    )?;
    game.set_traps(&parse_cells(&cli.traps)?)?;
    game.set_goals(&parse_cells(&cli.goals)?)?;

    let stats = game.solve_with_params(Default::default())?;
    println!(
        "solved {} states (unsafe: evader {}, pursuer {})",
        stats.total_states, stats.evader_unsafe_states, stats.pursuer_unsafe_states
    );

    for step in 1..=cli.max_steps {
        if game.is_over() {
            break;
        }
        game.step()?;
        if cli.json {
            println!("{}", game.snapshot_json()?);
        } else {
            println!(
                "step {step}  (evader: {}, pursuer: {})",
                policy_label(&game, Player::Evader),
                policy_label(&game, Player::Pursuer),
            );
            print!("{}", render(&game));
        }
    }

    match game.winner() {
        Some(Player::Evader) => println!("the evader reached a goal"),
        Some(Player::Pursuer) => println!("the pursuer won"),
        None => println!("no winner within {} steps", cli.max_steps),
    }
    Ok(())
}
