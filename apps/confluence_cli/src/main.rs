use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use confluence_core::payload::{Engine, ExportFormat, ExportPayload, MixPayload, Operation};
use confluence_core::resolver;
use confluence_core::types::{Ambience, Mode, Ms, Session, SLOTS};
use confluence_gateway::{GatewayError, RenderReport, ServiceClient};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let client = ServiceClient::new(&cli.server);

    match cli.command {
        Commands::Health => run_health(&client),
        Commands::Upload { files } => run_upload(&client, &files),
        Commands::Durations { timeline } => run_durations(&client, &timeline),
        Commands::Preview {
            timeline,
            concat_engine,
            out,
        } => run_preview(&client, &timeline, concat_engine, &out),
        Commands::Render {
            timeline,
            concat_engine,
        } => run_render(&client, &timeline, concat_engine),
        Commands::Concat => report_outcome(client.concat()?),
        Commands::Export { format, mono, out } => run_export(&client, format, mono, &out),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_health(client: &ServiceClient) -> anyhow::Result<()> {
    if client.health()? {
        println!("service is up");
    } else {
        println!("service responded but reports not-ok");
    }
    Ok(())
}

fn run_upload(client: &ServiceClient, files: &[PathBuf]) -> anyhow::Result<()> {
    let slotted: Vec<(usize, &std::path::Path)> = files
        .iter()
        .enumerate()
        .map(|(i, p)| (i + 1, p.as_path()))
        .collect();

    match client.upload(&slotted) {
        Ok(resp) if resp.success => {
            println!("uploaded {} file(s); unsent slots were purged server-side", files.len());
        }
        Ok(_) => println!("service accepted the request but stored nothing"),
        // Input-absent is an advisory, not a failure.
        Err(GatewayError::NoFiles) => println!("nothing to upload: no files given"),
        Err(e) => return Err(e.into()),
    }

    // Freshly stored files change the measured durations.
    let session = refreshed_session(client, &TimelineArgs::default())?;
    print_timeline(&session);
    Ok(())
}

fn run_durations(client: &ServiceClient, args: &TimelineArgs) -> anyhow::Result<()> {
    let session = refreshed_session(client, args)?;
    print_timeline(&session);
    Ok(())
}

fn run_preview(
    client: &ServiceClient,
    args: &TimelineArgs,
    concat_engine: bool,
    out: &PathBuf,
) -> anyhow::Result<()> {
    let session = refreshed_session(client, args)?;
    print_timeline(&session);

    let payload = MixPayload::build(&session, Operation::Preview, engine_override(concat_engine));
    let audio = client.preview(&payload)?;
    std::fs::write(out, &audio)
        .with_context(|| format!("writing preview to {}", out.display()))?;
    println!("preview written to {} ({} bytes)", out.display(), audio.len());
    Ok(())
}

fn run_render(
    client: &ServiceClient,
    args: &TimelineArgs,
    concat_engine: bool,
) -> anyhow::Result<()> {
    let session = refreshed_session(client, args)?;
    print_timeline(&session);

    let payload = MixPayload::build(&session, Operation::Render, engine_override(concat_engine));
    report_outcome(client.render(&payload)?)
}

fn run_export(
    client: &ServiceClient,
    format: ExportFormat,
    mono: bool,
    out: &PathBuf,
) -> anyhow::Result<()> {
    let payload = ExportPayload::new(format, mono);
    let audio = client.export(&payload)?;
    std::fs::write(out, &audio)
        .with_context(|| format!("writing export to {}", out.display()))?;
    println!("export written to {} ({} bytes)", out.display(), audio.len());
    Ok(())
}

fn report_outcome(report: RenderReport) -> anyhow::Result<()> {
    if !report.success {
        // Server-provided message, verbatim.
        bail!("{}", report.error.unwrap_or_else(|| "render failed".into()));
    }
    match report.details {
        Some(d) => println!(
            "done: duration {:.3}s, size {}",
            d.total_duration, d.file_size
        ),
        None => println!("done"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Session assembly
// ---------------------------------------------------------------------------

/// Build the session from CLI flags, then pull fresh durations from the
/// service. Durations must land before the resolver runs, or the displayed
/// timeline would be computed from stale zeros.
fn refreshed_session(client: &ServiceClient, args: &TimelineArgs) -> anyhow::Result<Session> {
    let mut session = session_from_args(args)?;
    let durations = client.durations()?;
    session.apply_durations(&durations.slot_durations()?);
    tracing::debug!(?durations, "durations refreshed");
    Ok(session)
}

fn session_from_args(args: &TimelineArgs) -> anyhow::Result<Session> {
    let mut session = Session::new();
    session.set_mode(args.mode);
    session.ambience = args.ambience;
    session.ambience_gain_db = args.amb_gain;

    // Offsets and crossfades address slots 2..=5; slot 1 is the anchor.
    for (i, &v) in args.offsets.iter().enumerate() {
        let slot = i + 2;
        if slot > SLOTS {
            bail!("too many offsets: at most {} (slots 2..=5)", SLOTS - 1);
        }
        session.set_offset(slot, Ms(v))?;
    }
    for (i, &v) in args.xf.iter().enumerate() {
        let slot = i + 2;
        if slot > SLOTS {
            bail!("too many crossfades: at most {} (slots 2..=5)", SLOTS - 1);
        }
        session.set_crossfade(slot, Ms(v))?;
    }
    // Gains and pans address slots 1..=5.
    for (i, &v) in args.gains.iter().enumerate() {
        let slot = i + 1;
        if slot > SLOTS {
            bail!("too many gains: at most {SLOTS}");
        }
        session.set_gain(slot, v)?;
    }
    for (i, &v) in args.pans.iter().enumerate() {
        let slot = i + 1;
        if slot > SLOTS {
            bail!("too many pans: at most {SLOTS}");
        }
        session.set_pan(slot, v)?;
    }
    Ok(session)
}

fn engine_override(concat_engine: bool) -> Option<Engine> {
    concat_engine.then_some(Engine::Concat)
}

fn print_timeline(session: &Session) {
    let starts = resolver::resolve_starts(session);
    let provisional = session.mode != Mode::Tao
        && (1..=SLOTS).any(|i| {
            session.slots[i].file.is_some() && session.slots[i].duration_ms == Ms::ZERO
        });

    println!("mode: {:?}", session.mode);
    for i in 1..=SLOTS {
        let slot = &session.slots[i];
        println!(
            "  slot {i}: start {} duration {} xf {}",
            starts[i], slot.duration_ms, slot.crossfade_ms
        );
    }
    println!("concat total: {}", resolver::total_concat_ms(session));
    if provisional {
        println!("(estimates: some durations not yet measured)");
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(author, version, about = "Five-track timeline assembler", long_about = None)]
struct Cli {
    /// Base URL of the rendering service.
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the rendering service is reachable.
    Health,
    /// Upload up to five source files; argument position selects the slot.
    Upload {
        #[arg(num_args = 0..=5)]
        files: Vec<PathBuf>,
    },
    /// Fetch measured durations and show the estimated timeline.
    Durations {
        #[command(flatten)]
        timeline: TimelineArgs,
    },
    /// Render the full mix and play it back locally as a file.
    Preview {
        #[command(flatten)]
        timeline: TimelineArgs,
        /// Force the concat engine without switching placement mode.
        #[arg(long)]
        concat_engine: bool,
        /// Where to write the preview WAV.
        #[arg(long, default_value = "preview.wav")]
        out: PathBuf,
    },
    /// Render the mix server-side, ready for export.
    Render {
        #[command(flatten)]
        timeline: TimelineArgs,
        #[arg(long)]
        concat_engine: bool,
    },
    /// Concatenate all stored tracks end-to-end, no crossfades.
    Concat,
    /// Download the last rendered mix in the chosen format.
    Export {
        #[arg(long, default_value = "wav")]
        format: ExportFormat,
        #[arg(long)]
        mono: bool,
        #[arg(long, default_value = "mix.wav")]
        out: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct TimelineArgs {
    /// Placement mode: tao (absolute), liam (relative-to-end), concat.
    #[arg(long, default_value = "tao")]
    mode: Mode,
    /// Offsets in ms for slots 2..=5, comma separated. Absolute under
    /// tao/concat; relative to the previous track's end under liam
    /// (negative opens a gap).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    offsets: Vec<i64>,
    /// Crossfade durations in ms for slots 2..=5, comma separated.
    #[arg(long, value_delimiter = ',')]
    xf: Vec<i64>,
    /// Ambience bed: none, water, wind, pads.
    #[arg(long, default_value = "none")]
    ambience: Ambience,
    /// Ambience gain in dB.
    #[arg(long, default_value_t = -24.0, allow_hyphen_values = true)]
    amb_gain: f64,
    /// Per-slot gain in dB for slots 1..=5, comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    gains: Vec<f64>,
    /// Per-slot pan in [-1, 1] for slots 1..=5, comma separated.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pans: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn args(mode: Mode, offsets: &[i64]) -> TimelineArgs {
        TimelineArgs {
            mode,
            offsets: offsets.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn session_from_args_routes_offsets_by_mode() {
        let s = session_from_args(&args(Mode::Liam, &[1_000, -2_000])).unwrap();
        assert_eq!(s.slots[2].offset_rel_ms, Ms(1_000));
        assert_eq!(s.slots[3].offset_rel_ms, Ms(-2_000));
        // Absolute side keeps its stock values.
        assert_eq!(s.slots[2].offset_abs_ms, Ms(14_000));

        let s = session_from_args(&args(Mode::Tao, &[7_000])).unwrap();
        assert_eq!(s.slots[2].offset_abs_ms, Ms(7_000));
        assert_eq!(s.slots[2].offset_rel_ms, Ms(14_000));
    }

    #[test]
    fn session_from_args_rejects_too_many_values() {
        assert!(session_from_args(&args(Mode::Tao, &[1, 2, 3, 4, 5])).is_err());

        let mut a = args(Mode::Tao, &[]);
        a.gains = vec![0.0; 6];
        assert!(session_from_args(&a).is_err());
    }

    #[test]
    fn default_mode_and_out_paths_parse() {
        let cli = Cli::parse_from(["confluence", "durations"]);
        match cli.command {
            Commands::Durations { timeline } => assert_eq!(timeline.mode, Mode::Tao),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn preview_flags_parse() {
        let cli = Cli::parse_from([
            "confluence",
            "preview",
            "--mode",
            "liam",
            "--offsets",
            "14000,0,0,0",
            "--xf",
            "5000,5000",
            "--concat-engine",
            "--out",
            "listen.wav",
        ]);
        match cli.command {
            Commands::Preview {
                timeline,
                concat_engine,
                out,
            } => {
                assert_eq!(timeline.mode, Mode::Liam);
                assert_eq!(timeline.offsets, vec![14_000, 0, 0, 0]);
                assert_eq!(timeline.xf, vec![5_000, 5_000]);
                assert!(concat_engine);
                assert_eq!(out, PathBuf::from("listen.wav"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn negative_values_accepted_in_lists() {
        let cli = Cli::parse_from([
            "confluence",
            "render",
            "--mode",
            "liam",
            "--offsets",
            "-5000,0",
            "--gains",
            "-3.0,0,0",
        ]);
        match cli.command {
            Commands::Render { timeline, .. } => {
                assert_eq!(timeline.offsets, vec![-5_000, 0]);
                let s = session_from_args(&timeline).unwrap();
                assert_eq!(s.slots[2].offset_rel_ms, Ms(-5_000));
                assert!((s.slots[1].gain_db - -3.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
