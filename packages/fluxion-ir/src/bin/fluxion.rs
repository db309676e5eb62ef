/*
 * Fluxion Analysis Driver
 *
 * Command-line front end over the analysis engines.
 *
 * Usage:
 *   fluxion taint <module.json> --spec <taint.spec> [--step-budget N]
 *   fluxion slice <module.json> --seed <inst-id> [--thin] [--forward]
 *                 [--context-sensitive] [--max-depth N]
 *   fluxion rd    <module.json> [--k-cfa N] [--naive] [--verbose]
 *
 * Exit codes: 0 success, 1 IR parse failure, 2 configuration failure,
 * 3 analysis aborted by budget or cancellation.
 */

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use fluxion_ir::features::slicing::{SliceConfig, SlicingService, ThinSliceConfig};
use fluxion_ir::features::taint_analysis::infrastructure::spec_parser;
use fluxion_ir::shared::models::{InstId, Module, ModuleIndex, StepBudget};
use fluxion_ir::{
    EngineConfig, IdentityAliasOracle, IfdsConfig, LinearStrategy, PdgBuilder, PdgNodeKey,
    ReachingDefs, TaintAnalysisService,
};

const EXIT_PARSE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_ABORTED: u8 = 3;

struct SliceArgs {
    seed: InstId,
    thin: bool,
    forward: bool,
    context_sensitive: bool,
    max_depth: Option<usize>,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        usage();
        return ExitCode::from(EXIT_CONFIG);
    }

    let command = args[1].as_str();
    let module_path = PathBuf::from(&args[2]);
    let rest = &args[3..];

    let module = match load_module(&module_path) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::from(EXIT_PARSE);
        }
    };

    match command {
        "taint" => run_taint(&module, rest),
        "slice" => run_slice(&module, rest),
        "rd" => run_reaching_defs(&module, rest),
        other => {
            eprintln!("error: unknown command '{other}'");
            usage();
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

fn usage() {
    eprintln!("usage: fluxion <taint|slice|rd> <module.json> [options]");
    eprintln!("  taint --spec <file> [--step-budget N]");
    eprintln!("  slice --seed <inst-id> [--thin] [--forward] [--context-sensitive] [--max-depth N]");
    eprintln!("  rd    [--k-cfa N] [--naive] [--verbose]");
}

fn load_module(path: &Path) -> Result<ModuleIndex, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {path:?}: {e}"))?;
    let module: Module =
        serde_json::from_str(&content).map_err(|e| format!("cannot parse {path:?}: {e}"))?;
    module.finalize().map_err(|e| e.to_string())
}

fn run_taint(module: &ModuleIndex, rest: &[String]) -> ExitCode {
    let mut spec_path: Option<PathBuf> = None;
    let mut step_budget: Option<u64> = None;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--spec" => {
                i += 1;
                spec_path = rest.get(i).map(PathBuf::from);
            }
            "--step-budget" => {
                i += 1;
                step_budget = rest.get(i).and_then(|s| s.parse().ok());
            }
            other => {
                eprintln!("error: unknown taint option '{other}'");
                return ExitCode::from(EXIT_CONFIG);
            }
        }
        i += 1;
    }
    let Some(spec_path) = spec_path else {
        eprintln!("error: taint requires --spec <file>");
        return ExitCode::from(EXIT_CONFIG);
    };
    let spec = match spec_parser::parse_file(&spec_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let config = IfdsConfig {
        step_budget: step_budget.map(StepBudget::steps).unwrap_or_default(),
        ..Default::default()
    };
    let oracle = IdentityAliasOracle;
    match TaintAnalysisService::run(module, &spec, &oracle, config) {
        Ok(outcome) => {
            print!("{}", TaintAnalysisService::render(&outcome, module.name()));
            if outcome.flags.is_partial() {
                ExitCode::from(EXIT_ABORTED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_PARSE)
        }
    }
}

fn run_slice(module: &ModuleIndex, rest: &[String]) -> ExitCode {
    let mut parsed = SliceArgs {
        seed: InstId(0),
        thin: false,
        forward: false,
        context_sensitive: false,
        max_depth: None,
    };
    let mut seed_given = false;
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--seed" => {
                i += 1;
                match rest.get(i).and_then(|s| s.parse().ok()) {
                    Some(id) => {
                        parsed.seed = InstId(id);
                        seed_given = true;
                    }
                    None => {
                        eprintln!("error: --seed needs an instruction id");
                        return ExitCode::from(EXIT_CONFIG);
                    }
                }
            }
            "--thin" => parsed.thin = true,
            "--forward" => parsed.forward = true,
            "--context-sensitive" => parsed.context_sensitive = true,
            "--max-depth" => {
                i += 1;
                parsed.max_depth = rest.get(i).and_then(|s| s.parse().ok());
            }
            other => {
                eprintln!("error: unknown slice option '{other}'");
                return ExitCode::from(EXIT_CONFIG);
            }
        }
        i += 1;
    }
    if !seed_given {
        eprintln!("error: slice requires --seed <inst-id>");
        return ExitCode::from(EXIT_CONFIG);
    }

    let started = Instant::now();
    let oracle = IdentityAliasOracle;
    let pdg = match PdgBuilder::new(module, &oracle).build() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(EXIT_PARSE);
        }
    };
    let mut service = SlicingService::new(pdg);
    let Some(seed) = service.pdg().node_index(PdgNodeKey::Inst(parsed.seed)) else {
        eprintln!("error: no PDG node for instruction {}", parsed.seed);
        return ExitCode::from(EXIT_CONFIG);
    };

    println!("== slice: {} ==", module.name());
    let (nodes, extra) = if parsed.thin {
        let config = ThinSliceConfig {
            context_sensitive: parsed.context_sensitive,
            max_depth: parsed.max_depth,
            ..Default::default()
        };
        let result = service.thin_backward(&[seed], &config);
        (result.nodes, format!("{:?}", result.diagnostics))
    } else {
        let config = SliceConfig {
            max_depth: parsed.max_depth,
            ..SliceConfig::data_and_params()
        };
        let result = if parsed.forward {
            service.forward(&[seed], &config)
        } else {
            service.backward(&[seed], &config)
        };
        (result.nodes, format!("{:?}", result.diagnostics))
    };
    println!(
        "time: {}ms  incomplete: false  cancelled: false",
        started.elapsed().as_millis()
    );
    println!("diagnostics: {extra}");
    let mut keys: Vec<String> = nodes
        .iter()
        .map(|&ix| format!("{:?}", service.pdg().node(ix).key))
        .collect();
    keys.sort();
    for key in keys {
        println!("  {key}");
    }
    ExitCode::SUCCESS
}

fn run_reaching_defs(module: &ModuleIndex, rest: &[String]) -> ExitCode {
    let mut config = EngineConfig::default();
    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--k-cfa" => {
                i += 1;
                config.k_cfa_depth = match rest.get(i).and_then(|s| s.parse().ok()) {
                    Some(k) => k,
                    None => {
                        eprintln!("error: --k-cfa needs a number");
                        return ExitCode::from(EXIT_CONFIG);
                    }
                };
            }
            "--naive" => config.linear_strategy = LinearStrategy::Naive,
            "--verbose" => config.verbose = true,
            other => {
                eprintln!("error: unknown rd option '{other}'");
                return ExitCode::from(EXIT_CONFIG);
            }
        }
        i += 1;
    }

    let started = Instant::now();
    match ReachingDefs::run(module, config) {
        Ok(result) => {
            println!("== reaching definitions: {} ==", module.name());
            println!(
                "time: {}ms  incomplete: {}  cancelled: {}",
                started.elapsed().as_millis(),
                result.flags.incomplete,
                result.flags.cancelled
            );
            let mut entries: Vec<(String, String)> = result
                .block_entry_facts
                .iter()
                .map(|(sym, fact)| {
                    let bits: Vec<usize> = fact.ones().collect();
                    (result.symbols.name(*sym).to_string(), format!("{bits:?}"))
                })
                .collect();
            entries.sort();
            for (name, bits) in entries {
                println!("  {name}: {bits}");
            }
            if result.flags.is_partial() {
                ExitCode::from(EXIT_ABORTED)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_PARSE)
        }
    }
}
