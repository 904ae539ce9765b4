//! Symbol extraction from compiled binaries.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::process::{Invocation, ProcessError};
use crate::tools::{Capability, ToolContext, CXXFILT, NM, OBJDUMP, SIZE};

/// Names passed to one c++filt invocation.
const DEMANGLE_CHUNK: usize = 500;

/// Mangled names of defined text symbols from `nm --defined-only`.
pub fn parse_nm_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return None;
            }
            let (kind, name) = (parts[1], parts[2]);
            (matches!(kind, "T" | "t") && name.starts_with("_Z")).then(|| name.to_string())
        })
        .collect()
}

/// Mangled names of function entries in a `.text*` section from `objdump -t`.
pub fn parse_objdump_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return None;
            }
            let is_function = parts.contains(&"F");
            let in_text = parts.iter().any(|p| p.starts_with(".text"));
            let name = parts[parts.len() - 1];
            (is_function && in_text && name.starts_with("_Z")).then(|| name.to_string())
        })
        .collect()
}

/// Text-section size: first numeric column of `size` output.
pub fn parse_size_output(output: &str) -> u64 {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find_map(|first| first.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Demangled, standard-library-free symbol names of one binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSet {
    names: BTreeSet<String>,
}

impl SymbolSet {
    /// Keep names that actually demangled and are outside `std::`.
    pub fn from_demangled<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let names = pairs
            .into_iter()
            .filter(|(mangled, demangled)| mangled != demangled && !demangled.starts_with("std::"))
            .map(|(_, demangled)| demangled)
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names present here but not in `other`, in sorted order.
    pub fn difference<'a>(&'a self, other: &'a SymbolSet) -> impl Iterator<Item = &'a str> {
        self.names.difference(&other.names).map(String::as_str)
    }
}

impl FromIterator<String> for SymbolSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// A built executable and what was extracted from it.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    pub binary: PathBuf,
    pub text_bytes: u64,
    pub symbols: SymbolSet,
}

/// Demangle names with c++filt, pairing each input with its output.
///
/// Returns an empty list when c++filt cannot be located.
pub fn demangle_batch(names: &[String], ctx: &ToolContext) -> Result<Vec<(String, String)>, ProcessError> {
    let Capability::Found(cxxfilt) = ctx.locate(&CXXFILT) else {
        warn!("c++filt not found; symbols cannot be demangled");
        return Ok(Vec::new());
    };

    let mut pairs = Vec::with_capacity(names.len());
    for chunk in names.chunks(DEMANGLE_CHUNK) {
        let invocation = Invocation::new(&cxxfilt)
            .args(chunk)
            .timeout(ctx.config().timeouts.demangle());
        let output = ctx.run(&invocation)?;
        let demangled: Vec<&str> = output.stdout.lines().collect();
        if !output.success || demangled.len() != chunk.len() {
            debug!(expected = chunk.len(), got = demangled.len(), "c++filt output mismatch, keeping mangled names");
            pairs.extend(chunk.iter().map(|n| (n.clone(), n.clone())));
            continue;
        }
        pairs.extend(
            chunk
                .iter()
                .zip(demangled)
                .map(|(mangled, d)| (mangled.clone(), d.trim().to_string())),
        );
    }
    Ok(pairs)
}

/// Demangle one name; `None` if it did not change or c++filt is unavailable.
pub fn demangle_one(name: &str, ctx: &ToolContext) -> Option<String> {
    let Capability::Found(cxxfilt) = ctx.locate(&CXXFILT) else {
        return None;
    };
    let invocation = Invocation::new(cxxfilt)
        .arg(name)
        .timeout(ctx.config().timeouts.demangle());
    let output = ctx.run(&invocation).ok().filter(|o| o.success)?;
    let demangled = output.stdout.trim();
    (!demangled.is_empty() && demangled != name).then(|| demangled.to_string())
}

fn run_inspector(
    spec: &crate::tools::ToolSpec,
    args: &[&str],
    binary: &Path,
    ctx: &ToolContext,
) -> Result<Option<String>, ProcessError> {
    let Capability::Found(tool) = ctx.locate(spec) else {
        warn!(tool = spec.name, "inspector not found, skipping pass");
        return Ok(None);
    };
    let invocation = Invocation::new(tool)
        .args(args)
        .arg(binary)
        .timeout(ctx.config().timeouts.inspect());
    let output = ctx.run(&invocation)?;
    if !output.success {
        debug!(tool = spec.name, stderr = %output.stderr.trim(), "inspector failed");
    }
    Ok(Some(output.stdout))
}

/// Run both symbol passes and the size probe on one binary.
pub fn inspect_binary(binary: &Path, ctx: &ToolContext) -> Result<BuildArtifact, ProcessError> {
    let mut mangled: BTreeSet<String> = BTreeSet::new();

    if let Some(out) = run_inspector(&NM, &["--defined-only"], binary, ctx)? {
        mangled.extend(parse_nm_output(&out));
    }
    if let Some(out) = run_inspector(&OBJDUMP, &["-t"], binary, ctx)? {
        mangled.extend(parse_objdump_output(&out));
    }
    let text_bytes = run_inspector(&SIZE, &[], binary, ctx)?
        .map(|out| parse_size_output(&out))
        .unwrap_or(0);

    let mangled: Vec<String> = mangled.into_iter().collect();
    let symbols = SymbolSet::from_demangled(demangle_batch(&mangled, ctx)?);
    debug!(binary = %binary.display(), mangled = mangled.len(), kept = symbols.len(), text_bytes, "inspected binary");

    Ok(BuildArtifact {
        binary: binary.to_path_buf(),
        text_bytes,
        symbols,
    })
}
