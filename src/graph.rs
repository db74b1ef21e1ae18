//! Static service graph and operation registry.
//!
//! The pipeline services and their dependency order are fixed at compile
//! time. Operations select a subset of services; [`order_for`] returns that
//! subset in deterministic topological order (Kahn's algorithm, tie-broken
//! by declaration order). The current pipelines are straight lines, but the
//! ordering pass does not assume that — a branching dependency added later
//! slots in without redesign.

use crate::error::ConfigError;

/// One named compose service and its place in the pipeline.
#[derive(Debug)]
pub struct ServiceDefinition {
    /// Compose service name.
    pub name: &'static str,
    /// Image reference built for this service.
    pub image: &'static str,
    /// In-container mount points fed from the shared host bind directory.
    pub mounts: &'static [&'static str],
    /// Names of services whose outputs this service consumes.
    pub depends_on: &'static [&'static str],
    /// Default subpath under the project root this service populates.
    /// Plan builders override this per mode (daily vs forecast).
    pub output_subpath: Option<&'static str>,
}

/// All pipeline services, in image build order. Declaration order is the
/// topological tie-break.
pub const SERVICES: &[ServiceDefinition] = &[
    ServiceDefinition {
        name: "base",
        image: "nhmusgs/base",
        mounts: &["/nhm"],
        depends_on: &[],
        output_subpath: None,
    },
    ServiceDefinition {
        name: "gridmetetl",
        image: "nhmusgs/gridmetetl",
        mounts: &["/nhm"],
        depends_on: &["base"],
        output_subpath: Some("daily/input"),
    },
    ServiceDefinition {
        name: "ncf2cbh",
        image: "nhmusgs/ncf2cbh",
        mounts: &["/nhm"],
        depends_on: &["gridmetetl"],
        output_subpath: Some("daily/input"),
    },
    ServiceDefinition {
        name: "prms",
        image: "nhmusgs/prms",
        mounts: &["/nhm"],
        depends_on: &["ncf2cbh"],
        output_subpath: Some("daily/output"),
    },
    ServiceDefinition {
        name: "out2ncf",
        image: "nhmusgs/out2ncf",
        mounts: &["/nhm"],
        depends_on: &["prms"],
        output_subpath: Some("daily/output"),
    },
    ServiceDefinition {
        name: "cfsv2etl",
        image: "nhmusgs/cfsv2etl",
        mounts: &["/nhm"],
        depends_on: &["base"],
        output_subpath: Some("forecast/input"),
    },
    ServiceDefinition {
        name: "ncf2zarr",
        image: "nhmusgs/ncf2zarr",
        mounts: &["/nhm"],
        depends_on: &["out2ncf"],
        output_subpath: Some("forecast/output"),
    },
];

/// A named top-level workflow and the services it touches.
#[derive(Debug)]
pub struct Operation {
    /// Operation name as exposed on the CLI.
    pub name: &'static str,
    /// Services the operation launches. Empty for host-side operations.
    pub services: &'static [&'static str],
}

/// Registered operations. `fetch-op-results` is host-side file movement and
/// launches no services.
pub const OPERATIONS: &[Operation] = &[
    Operation {
        name: "build-images",
        services: &[
            "base", "gridmetetl", "ncf2cbh", "prms", "out2ncf", "cfsv2etl", "ncf2zarr",
        ],
    },
    Operation {
        name: "load-data",
        services: &["base"],
    },
    Operation {
        name: "run-operational",
        services: &["base", "gridmetetl", "ncf2cbh", "prms", "out2ncf"],
    },
    Operation {
        name: "fetch-op-results",
        services: &[],
    },
    Operation {
        name: "run-sub-seasonal",
        services: &["base", "ncf2cbh", "prms", "out2ncf"],
    },
    Operation {
        name: "update-cfsv2",
        services: &["base", "cfsv2etl"],
    },
    Operation {
        name: "conv-output-to-zarr",
        services: &["ncf2zarr"],
    },
    Operation {
        name: "run-seasonal",
        services: &["base", "cfsv2etl", "ncf2cbh", "prms", "out2ncf"],
    },
];

/// Look up a service definition by name.
#[must_use]
pub fn service(name: &str) -> Option<&'static ServiceDefinition> {
    SERVICES.iter().find(|s| s.name == name)
}

/// Resolve the ordered service list for a registered operation.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownOperation`] for an unregistered name and
/// [`ConfigError::DanglingDependency`] when a declared dependency does not
/// resolve to a defined service (static data, but checked anyway).
pub fn order_for(operation_name: &str) -> Result<Vec<&'static ServiceDefinition>, ConfigError> {
    let operation = OPERATIONS
        .iter()
        .find(|op| op.name == operation_name)
        .ok_or_else(|| ConfigError::UnknownOperation {
            name: operation_name.to_string(),
            valid: OPERATIONS
                .iter()
                .map(|op| op.name)
                .collect::<Vec<_>>()
                .join(", "),
        })?;
    topological_order(SERVICES, operation.services)
}

/// Kahn's algorithm over the subgraph induced by `subset`, selecting the
/// first ready service in table declaration order at every step.
fn topological_order<'a>(
    table: &'a [ServiceDefinition],
    subset: &[&str],
) -> Result<Vec<&'a ServiceDefinition>, ConfigError> {
    let included: Vec<&ServiceDefinition> = table
        .iter()
        .filter(|s| subset.contains(&s.name))
        .collect();

    for svc in &included {
        for dep in svc.depends_on {
            if !table.iter().any(|s| s.name == *dep) {
                return Err(ConfigError::DanglingDependency {
                    service: svc.name.to_string(),
                    dependency: (*dep).to_string(),
                });
            }
        }
    }

    let mut ordered = Vec::with_capacity(included.len());
    let mut placed = vec![false; included.len()];
    while ordered.len() < included.len() {
        let next = included.iter().enumerate().position(|(idx, svc)| {
            !placed[idx]
                && svc.depends_on.iter().all(|dep| {
                    // Dependencies outside the subset do not constrain it.
                    !subset.contains(dep)
                        || ordered
                            .iter()
                            .any(|done: &&ServiceDefinition| done.name == *dep)
                })
        });
        match next {
            Some(idx) => {
                placed[idx] = true;
                ordered.push(included[idx]);
            }
            // Unreachable for the static table (a DAG); guards against a
            // future edit introducing a cycle.
            None => {
                return Err(ConfigError::DependencyCycle {
                    services: included
                        .iter()
                        .enumerate()
                        .filter(|(idx, _)| !placed[*idx])
                        .map(|(_, svc)| svc.name.to_string())
                        .collect(),
                });
            }
        }
    }
    Ok(ordered)
}
