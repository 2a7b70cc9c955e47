//! Class descriptors: the contract between the external syntax parser / project discovery and
//! the semantic graph engine.
//!
//! **Parser mapping**: one `ParsedFile` per processed source file, each carrying the
//! `ClassDescriptor`s declared in it. Project discovery contributes `ProjectDescriptor`s.
//! **Engine usage**: identity = `full_name()`, structural shape = base types / interfaces /
//! constructors, naming convention = `name`. Descriptors are immutable once produced.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

/// Structural kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Record,
    Struct,
    Interface,
    Enum,
}

/// A constructor or method parameter: name plus declared type text (e.g. `IRepository<Order>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default_value: None,
        }
    }
}

/// A declared property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub type_name: String,
    /// Accessor text as written, e.g. `get; private set;`.
    #[serde(default)]
    pub accessors: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A declared method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub return_type: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    /// Modifiers such as `async`, `virtual`, `override`, `static`.
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl MethodDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A declared constructor. Parameter order is declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDescriptor {
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    /// Primary constructor declared on the type header.
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl ConstructorDescriptor {
    pub fn with_parameters(parameters: Vec<ParameterDescriptor>) -> Self {
        Self {
            parameters,
            ..Self::default()
        }
    }
}

/// One class, record, struct, interface or enum as seen by the parser.
///
/// Type references (`base_types`, `interfaces`, parameter types) are kept as the raw declared
/// text, generic arguments included. The engine never resolves them beyond short-name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Unqualified name, e.g. `CreateOrderCommand`.
    pub name: String,
    /// Enclosing namespace, possibly empty.
    #[serde(default)]
    pub namespace: String,
    /// Declaring file as reported by the parser.
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub base_types: Vec<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub generic_params: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub constructors: Vec<ConstructorDescriptor>,
    /// Source-level annotations, e.g. `ApiController`, `HttpPost("/api/orders")`.
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub using_directives: Vec<String>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// Fully qualified name: `namespace.name`, or `name` when the namespace is empty.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// All constructor parameters in declaration order, across every constructor.
    pub fn constructor_parameters(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.constructors.iter().flat_map(|ctor| ctor.parameters.iter())
    }

    pub fn is_abstract(&self) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case("abstract"))
    }
}

/// A package reference declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

const TEST_PACKAGES: &[&str] = &["xunit", "nunit", "mstest", "xunit.core"];
const WEB_PACKAGES: &[&str] = &["Microsoft.AspNetCore.App", "FastEndpoints"];

/// A project as reported by project/solution discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub name: String,
    /// Path of the project file; its parent directory owns the sources below it.
    #[serde(default)]
    pub path: String,
    /// Framework/SDK identifier, e.g. `Microsoft.NET.Sdk.Web`.
    #[serde(default)]
    pub sdk: String,
    #[serde(default)]
    pub packages: Vec<PackageRef>,
    #[serde(default)]
    pub source_files: Vec<String>,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn is_test_project(&self) -> bool {
        self.packages.iter().any(|pkg| {
            let lower = pkg.name.to_lowercase();
            TEST_PACKAGES.contains(&lower.as_str()) || lower.contains("test")
        })
    }

    pub fn is_web_project(&self) -> bool {
        self.sdk.contains("Web")
            || self
                .packages
                .iter()
                .any(|pkg| WEB_PACKAGES.contains(&pkg.name.as_str()))
    }

    /// Directory containing the project file, separator-normalized, without trailing slash.
    pub fn directory(&self) -> Option<String> {
        let normalized = normalize_path(&self.path);
        let (dir, _) = normalized.rsplit_once('/')?;
        (!dir.is_empty()).then(|| dir.to_string())
    }
}

/// Parser output for one source file. `error` marks a file the parser could not handle; its
/// classes are ignored and it is counted as unparsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub path: String,
    #[serde(default)]
    pub classes: Vec<ClassDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the engine consumes for one run: discovered projects plus per-file parser output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseSnapshot {
    /// Codebase root; relative source paths are resolved against it for fingerprinting.
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub solution_name: String,
    #[serde(default)]
    pub projects: Vec<ProjectDescriptor>,
    #[serde(default)]
    pub files: Vec<ParsedFile>,
}

impl CodebaseSnapshot {
    /// Classes of every successfully parsed file, in file order.
    pub fn classes(&self) -> Vec<ClassDescriptor> {
        self.files
            .iter()
            .filter(|f| f.error.is_none())
            .flat_map(|f| f.classes.iter().cloned())
            .collect()
    }

    pub fn unparsed_count(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count()
    }

    pub fn source_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

// -----------------------------------------------------------------------------
// Type-name helpers
// -----------------------------------------------------------------------------

static GENERIC_ARG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*([^<>,\s]+)").expect("valid generic-argument regex"));

/// Strips everything from the first type-argument delimiter: `Repository<Order>` → `Repository`.
pub fn strip_generic(type_name: &str) -> &str {
    match type_name.find('<') {
        Some(idx) => type_name[..idx].trim(),
        None => type_name.trim(),
    }
}

/// First generic type argument: `IRepository<Order>` → `Order`.
pub fn generic_argument(type_name: &str) -> Option<&str> {
    GENERIC_ARG
        .captures(type_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Converts `\` separators to `/`.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// True when two paths name the same file: equal after separator normalization, or one is a
/// suffix of the other on a path-component boundary. Empty paths never match.
///
/// `Order.cs` matches `src/Core/Order.cs` but not `src/Core/BigOrder.cs`.
pub fn paths_match(a: &str, b: &str) -> bool {
    let a = normalize_path(a);
    let b = normalize_path(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };
    long == short
        || long
            .strip_suffix(short.as_str())
            .is_some_and(|head| head.ends_with('/') || short.starts_with('/'))
}
