use std::env;
use std::process::ExitCode;
use xmi_sequencer::MetadataProbe;

fn main() -> ExitCode {
    env_logger::init();
    let mut args = env::args();
    let _ = args.next();
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: xmi_probe <path-to-xmi-file>");
            return ExitCode::FAILURE;
        }
    };

    let report = MetadataProbe::probe_file(&path);
    if !report.found {
        eprintln!(
            "no EVNT chunk found in '{}': {}",
            path,
            report.error.as_deref().unwrap_or("unknown error")
        );
        return ExitCode::FAILURE;
    }

    println!("file:             {}", path);
    println!("duration:         {:.3}s", report.duration_seconds);
    println!("tempo:            {:.1} BPM", report.bpm);
    println!("time signature:   {}/{}", report.ts_num, report.ts_den);
    println!("event count:      {}", report.event_count);
    if let Some(error) = &report.error {
        println!("stopped early:    {}", error);
    }

    ExitCode::SUCCESS
}
