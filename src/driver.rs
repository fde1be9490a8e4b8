//! Driver — JSON case enumeration and the two pipelines (spec.md §6,
//! §2's data-flow summary). Out of scope for the core per spec.md §1,
//! but still needs a real, testable surface: this module is the thin
//! glue the CLI in [`crate::main`] calls into, kept separate so the
//! pipelines are testable without a filesystem.

use crate::differentiator;
use crate::error::{CompileError, Result};
use crate::printer;
use crate::types::Type;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// One case JSON object (spec.md §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub name: String,
    pub ins: Vec<String>,
    pub outs: Vec<String>,
    pub data_type: String,
    pub kernel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_to: Option<Vec<String>>,
}

/// Case filenames the reference enumerates: `case1` through
/// `case<count>`, plus `example`, skipping the configured numbers.
fn case_stems(case_count: u32, skip: &[u32]) -> Vec<String> {
    let mut stems: Vec<String> = (1..=case_count)
        .filter(|n| !skip.contains(n))
        .map(|n| format!("case{n}"))
        .collect();
    stems.push("example".to_string());
    stems
}

fn read_case(path: &Path) -> Result<Case> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn write_case(path: &Path, case: &Case) -> Result<()> {
    let text = serde_json::to_string_pretty(case)?;
    fs::write(path, text)?;
    Ok(())
}

/// Project 1: parse each case's `kernel` and print it as C code, one
/// `.cc` file per case, named `grad_<stem>.cc` to match the
/// reference's `./kernels/grad_*` convention.
pub fn run_lower(cases_dir: &Path, output_dir: &Path, case_count: u32, skip: &[u32]) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    for stem in case_stems(case_count, skip) {
        let in_path = cases_dir.join(format!("{stem}.new.json"));
        let case = match read_case(&in_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(case = %stem, error = %e, "skipping case: could not read");
                continue;
            }
        };
        match lower_case(&case) {
            Ok(code) => {
                let out_path = output_dir.join(format!("grad_{stem}.cc"));
                fs::write(&out_path, code)?;
                info!(case = %stem, out = %out_path.display(), "lowered");
            }
            Err(e) if !e.is_fatal() => {
                error!(case = %stem, error = %e, "skipping case: compile error");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn lower_case(case: &Case) -> Result<String> {
    let data_type = Type::from_data_type_str(&case.data_type).ok_or_else(|| {
        CompileError::InvalidCase(format!("unknown data_type {:?}", case.data_type))
    })?;
    let kernel = crate::parser::parse_kernel_source(
        &case.name,
        data_type,
        case.ins.clone(),
        case.outs.clone(),
        &case.kernel,
    )?;
    Ok(printer::print_kernel(&kernel))
}

/// Project 2: differentiate each case's forward kernel with respect to
/// its `grad_to` targets, writing a `<stem>.new.json` with updated
/// `ins`/`outs`/`kernel` and `grad_to` dropped, back into `cases_dir`
/// (the reference writes Project 2's output alongside its input).
pub fn run_differentiate(cases_dir: &Path, case_count: u32, skip: &[u32]) -> Result<()> {
    for stem in case_stems(case_count, skip) {
        let in_path = cases_dir.join(format!("{stem}.json"));
        let case = match read_case(&in_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(case = %stem, error = %e, "skipping case: could not read");
                continue;
            }
        };
        match differentiate_case(&case) {
            Ok(new_case) => {
                let out_path = cases_dir.join(format!("{stem}.new.json"));
                write_case(&out_path, &new_case)?;
                info!(case = %stem, out = %out_path.display(), "differentiated");
            }
            Err(e) if !e.is_fatal() => {
                error!(case = %stem, error = %e, "skipping case: differentiation error");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn differentiate_case(case: &Case) -> Result<Case> {
    let lhs_name = case.outs.first().ok_or_else(|| {
        CompileError::InvalidCase(format!("case {:?} has no outs entry", case.name))
    })?;
    let targets = case.grad_to.clone().unwrap_or_default();
    let gradient = differentiator::differentiate_case(&case.kernel, lhs_name, &targets)?;
    Ok(Case {
        name: case.name.clone(),
        ins: gradient.ins,
        outs: gradient.outs,
        data_type: case.data_type.clone(),
        kernel: gradient.kernel,
        grad_to: None,
    })
}
