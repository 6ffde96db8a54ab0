use anyhow::{bail, Context, Result};
use biosig_lib::{
    analyzer::{calculate_parameter, find_points, modify_wave, windows},
    io::{
        import_points, import_wave, import_wave_csv, import_wave_samples, load_composite_data,
        save_composite_data,
    },
    plot::{figure_from_composite, Figure, PlotBackend, Series, DEFAULT_MAX_POINTS},
    Arguments, CompositeDataset, Procedure, ProcedureRegistry,
};
use clap::{Args, Parser, Subcommand};
use log::info;
use plotters::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "biosig",
    version,
    about = "Biosig: analyse composite biosignal datasets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where procedure options come from, in increasing priority.
#[derive(Args)]
struct ProcedureOptions {
    /// Registered procedure name (see `biosig procedures`)
    #[arg(long)]
    procedure: String,
    /// TOML file overriding default arguments
    #[arg(long)]
    args: Option<PathBuf>,
    /// Single override, `name=value`; may repeat
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
}

#[derive(Args)]
struct Window {
    #[arg(long)]
    begin: Option<f64>,
    #[arg(long)]
    end: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered procedures with their default arguments
    Procedures,
    /// Add a wave to a dataset file, creating the file if needed
    ImportWave {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        input: PathBuf,
        /// Type tag, defaults to the key
        #[arg(long = "type")]
        wave_type: Option<String>,
        /// Input is a single column of samples at this rate
        #[arg(long, conflicts_with_all = ["time_column", "value_column"])]
        fs: Option<f64>,
        /// Input is a CSV file; name of its time column
        #[arg(long, requires = "value_column")]
        time_column: Option<String>,
        #[arg(long, requires = "time_column")]
        value_column: Option<String>,
        /// Overwrite an existing wave under the same key
        #[arg(long)]
        replace: bool,
    },
    /// Add a point set to a dataset file, creating the file if needed
    ImportPoints {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        key: String,
        #[arg(long)]
        input: PathBuf,
        #[arg(long = "type")]
        point_type: Option<String>,
        #[arg(long)]
        replace: bool,
    },
    /// Print the span shared by the given channels
    TimeRange {
        #[arg(long)]
        data: PathBuf,
        #[arg(required = true)]
        channels: Vec<String>,
    },
    /// Run a modify procedure over part of a wave
    Modify {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        wave: String,
        #[command(flatten)]
        procedure: ProcedureOptions,
        #[command(flatten)]
        window: Window,
        /// Write the result back into the dataset file
        #[arg(long)]
        commit: bool,
    },
    /// Run a point finder over a time window
    FindPoints {
        #[arg(long)]
        data: PathBuf,
        /// Destination key, defaults to the procedure's output type
        #[arg(long)]
        key: Option<String>,
        /// Channels bounding the default window, defaults to the required ones
        #[arg(long = "channel")]
        channels: Vec<String>,
        #[command(flatten)]
        procedure: ProcedureOptions,
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        commit: bool,
    },
    /// Run a parameter calculator over consecutive intervals
    Parameter {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        key: Option<String>,
        #[arg(long = "channel")]
        channels: Vec<String>,
        /// Interval width in seconds; one interval over the window if absent
        #[arg(long)]
        interval: Option<f64>,
        #[command(flatten)]
        procedure: ProcedureOptions,
        #[command(flatten)]
        window: Window,
        #[arg(long)]
        commit: bool,
        /// Overwrite an existing parameter under the same key
        #[arg(long)]
        replace: bool,
    },
    /// Render channels of a dataset to a PNG via plotters
    Plot {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long = "channel")]
        channels: Vec<String>,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        window: Window,
        #[arg(long, default_value_t = 1000)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let registry = ProcedureRegistry::with_builtins();
    match cli.command {
        Commands::Procedures => cmd_procedures(&registry)?,
        Commands::ImportWave {
            data,
            key,
            input,
            wave_type,
            fs,
            time_column,
            value_column,
            replace,
        } => {
            let wave_type = wave_type.unwrap_or_else(|| key.clone());
            let wave = match (fs, time_column, value_column) {
                (Some(fs), _, _) => import_wave_samples(&input, fs, &wave_type)?,
                (None, Some(time), Some(value)) => {
                    import_wave_csv(&input, &time, &value, &wave_type)?
                }
                _ => import_wave(&input, &wave_type)?,
            };
            let mut dataset = open_or_create(&data)?;
            if replace {
                dataset.replace_wave(key.as_str(), wave);
            } else {
                dataset.add_wave(key.as_str(), wave)?;
            }
            save_composite_data(&data, &dataset)?;
            info!("stored wave '{key}' in {}", data.display());
        }
        Commands::ImportPoints {
            data,
            key,
            input,
            point_type,
            replace,
        } => {
            let point_type = point_type.unwrap_or_else(|| key.clone());
            let points = import_points(&input, &point_type)?;
            let mut dataset = open_or_create(&data)?;
            if replace {
                dataset.replace_points(key.as_str(), points);
            } else {
                dataset.add_points(key.as_str(), points)?;
            }
            save_composite_data(&data, &dataset)?;
            info!("stored points '{key}' in {}", data.display());
        }
        Commands::TimeRange { data, channels } => {
            let dataset = load_composite_data(&data)?;
            let (begin, end) = dataset.calculate_time_range(&channels[..])?;
            println!("{}", json!({ "begin": begin, "end": end }));
        }
        Commands::Modify {
            data,
            wave,
            procedure,
            window,
            commit,
        } => cmd_modify(&registry, &data, &wave, &procedure, &window, commit)?,
        Commands::FindPoints {
            data,
            key,
            channels,
            procedure,
            window,
            commit,
        } => cmd_find_points(
            &registry,
            &data,
            key,
            channels,
            &procedure,
            &window,
            commit,
        )?,
        Commands::Parameter {
            data,
            key,
            channels,
            interval,
            procedure,
            window,
            commit,
            replace,
        } => cmd_parameter(
            &registry,
            &data,
            ParameterTarget {
                key,
                channels,
                interval,
                replace,
            },
            &procedure,
            &window,
            commit,
        )?,
        Commands::Plot {
            data,
            out,
            channels,
            title,
            window,
            width,
            height,
        } => {
            let dataset = load_composite_data(&data)?;
            let wanted = (!channels.is_empty()).then_some(channels.as_slice());
            let fig = figure_from_composite(
                &dataset,
                window.begin,
                window.end,
                wanted,
                title.as_deref(),
                DEFAULT_MAX_POINTS,
            )?;
            PngBackend {
                path: out,
                size: (width, height),
            }
            .draw(&fig)?;
        }
    }
    Ok(())
}

fn open_or_create(path: &Path) -> Result<CompositeDataset> {
    if path.exists() {
        load_composite_data(path)
    } else {
        Ok(CompositeDataset::new())
    }
}

fn cmd_procedures(registry: &ProcedureRegistry) -> Result<()> {
    let procedures = registry
        .names()
        .map(|name| registry.import_procedure(name))
        .collect::<biosig_lib::Result<Vec<Procedure>>>()?;
    let infos: Vec<_> = procedures.iter().map(Procedure::info).collect();
    println!("{}", serde_json::to_string_pretty(&infos)?);
    Ok(())
}

/// Defaults, then the TOML file, then each `--set`.
fn resolve_arguments(procedure: &Procedure, options: &ProcedureOptions) -> Result<Arguments> {
    let mut arguments = procedure.default_arguments().clone();
    if let Some(path) = &options.args {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        arguments.apply(&Arguments::from_toml_str(&text)?);
    }
    for raw in &options.set {
        let (name, value) = Arguments::parse_assignment(raw)?;
        arguments.set(name, value);
    }
    Ok(arguments)
}

/// Explicit bounds win; a missing one comes from the channels' shared span.
fn resolve_window(
    dataset: &CompositeDataset,
    window: &Window,
    channels: &[String],
) -> Result<(f64, f64)> {
    if let (Some(begin), Some(end)) = (window.begin, window.end) {
        return Ok((begin, end));
    }
    if channels.is_empty() {
        bail!("--begin and --end are required when no channel bounds the window");
    }
    let (begin, end) = dataset.calculate_time_range(channels)?;
    Ok((window.begin.unwrap_or(begin), window.end.unwrap_or(end)))
}

fn print_preview<T: Serialize>(
    procedure: &Procedure,
    key: &str,
    committed: bool,
    result: &T,
) -> Result<()> {
    let out = json!({
        "procedure": procedure.name(),
        "key": key,
        "committed": committed,
        "result": result,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_modify(
    registry: &ProcedureRegistry,
    data: &Path,
    key: &str,
    options: &ProcedureOptions,
    window: &Window,
    commit: bool,
) -> Result<()> {
    let procedure = registry.import_procedure(&options.procedure)?;
    let arguments = resolve_arguments(&procedure, options)?;
    let mut dataset = load_composite_data(data)?;
    let (begin, end) = resolve_window(&dataset, window, &[key.to_string()])?;
    let wave = dataset
        .wave(key)
        .with_context(|| format!("dataset has no wave '{key}'"))?;
    let result = modify_wave(wave, begin, end, &procedure, &arguments)?;
    if commit {
        dataset
            .wave_mut(key)
            .with_context(|| format!("dataset has no wave '{key}'"))?
            .replace_slice(begin, end, &result)?;
        save_composite_data(data, &dataset)?;
        info!("replaced [{begin}, {end}) of wave '{key}' in {}", data.display());
    }
    print_preview(&procedure, key, commit, &result)
}

fn default_channels(procedure: &Procedure, channels: Vec<String>) -> Vec<String> {
    if !channels.is_empty() {
        return channels;
    }
    procedure
        .required_waves()
        .iter()
        .chain(procedure.required_points())
        .cloned()
        .collect()
}

fn cmd_find_points(
    registry: &ProcedureRegistry,
    data: &Path,
    key: Option<String>,
    channels: Vec<String>,
    options: &ProcedureOptions,
    window: &Window,
    commit: bool,
) -> Result<()> {
    let procedure = registry.import_procedure(&options.procedure)?;
    let arguments = resolve_arguments(&procedure, options)?;
    let mut dataset = load_composite_data(data)?;
    let channels = default_channels(&procedure, channels);
    let (begin, end) = resolve_window(&dataset, window, &channels)?;
    let points = find_points(&dataset, begin, end, &procedure, &arguments)?;
    let key = key.unwrap_or_else(|| procedure.output_type().to_string());
    print_preview(&procedure, &key, commit, &points)?;
    if commit {
        info!("joining {} points into '{key}'", points.len());
        dataset.join_points(key, points);
        save_composite_data(data, &dataset)?;
    }
    Ok(())
}

struct ParameterTarget {
    key: Option<String>,
    channels: Vec<String>,
    interval: Option<f64>,
    replace: bool,
}

fn cmd_parameter(
    registry: &ProcedureRegistry,
    data: &Path,
    target: ParameterTarget,
    options: &ProcedureOptions,
    window: &Window,
    commit: bool,
) -> Result<()> {
    let procedure = registry.import_procedure(&options.procedure)?;
    let arguments = resolve_arguments(&procedure, options)?;
    let mut dataset = load_composite_data(data)?;
    let channels = default_channels(&procedure, target.channels);
    let (begin, end) = resolve_window(&dataset, window, &channels)?;
    let intervals = match target.interval {
        Some(width) => windows(begin, end, width)?,
        None => vec![(begin, end)],
    };
    let series = calculate_parameter(&dataset, &intervals, &procedure, &arguments)?;
    let key = target
        .key
        .unwrap_or_else(|| procedure.output_type().to_string());
    print_preview(&procedure, &key, commit, &series)?;
    if commit {
        if target.replace {
            dataset.replace_parameter(key.as_str(), series);
        } else {
            dataset.add_parameter(key.as_str(), series)?;
        }
        save_composite_data(data, &dataset)?;
        info!("stored parameter '{key}' in {}", data.display());
    }
    Ok(())
}

/// Draws each series of a figure in its own panel, stacked vertically.
struct PngBackend {
    path: PathBuf,
    size: (u32, u32),
}

impl PlotBackend for PngBackend {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let root = match &fig.title {
            Some(title) => root.titled(title, ("sans-serif", 24))?,
            None => root,
        };
        if fig.series.is_empty() {
            root.present()?;
            return Ok(());
        }
        let (x_min, x_max) = fig.x_range;
        let panels = root.split_evenly((fig.series.len(), 1));
        for (panel, series) in panels.iter().zip(&fig.series) {
            let (lo, hi) = series.value_bounds().unwrap_or((0.0, 1.0));
            let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
            let mut chart = ChartBuilder::on(panel)
                .margin(8)
                .caption(series.name(), ("sans-serif", 16))
                .x_label_area_size(30)
                .y_label_area_size(50)
                .build_cartesian_2d(x_min..x_max, (lo - pad)..(hi + pad))?;
            let mut mesh = chart.configure_mesh();
            if let Some(label) = &fig.x.label {
                mesh.x_desc(label.as_str());
            }
            mesh.draw()?;
            match series {
                Series::Line(line) => {
                    let color = rgb(line.style.color.rgb());
                    chart.draw_series(LineSeries::new(
                        line.points.iter().map(|p| (p[0], p[1])),
                        color.stroke_width(line.style.width.round().max(1.0) as u32),
                    ))?;
                }
                Series::Markers(markers) => {
                    let color = rgb(markers.style.color.rgb());
                    let radius = markers.style.width.round().max(1.0) as i32;
                    chart.draw_series(
                        markers
                            .points
                            .iter()
                            .map(|p| Circle::new((p[0], p[1]), radius, color.filled())),
                    )?;
                }
                Series::Segments(segments) => {
                    let color = rgb(segments.style.color.rgb());
                    let width = segments.style.width.round().max(1.0) as u32;
                    chart.draw_series(segments.segments.iter().map(|s| {
                        PathElement::new(vec![(s[0], s[2]), (s[1], s[2])], color.stroke_width(width))
                    }))?;
                }
            }
        }
        root.present()?;
        info!("wrote {}", self.path.display());
        Ok(())
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> RGBColor {
    RGBColor(r, g, b)
}
