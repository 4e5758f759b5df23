//! The (category, event type) → metric emissions routing table.
//!
//! Routing is pure data: adding an event type means adding a [`Route`], never
//! touching control flow. Labels are matched after [`normalize_label`], so
//! `"Usuario Creado"`, `"usuario_creado"` and `"UsuarioCreado"` are the same
//! key, and every category and type carries English and Spanish aliases.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tally_core::metric::{MetricPeriod, MetricUnit};

/// The five event-producing domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// User and role lifecycle.
    UsersAndRoles,
    /// Service catalog.
    ServiceCatalog,
    /// Request and search lifecycle.
    Requests,
    /// Payments and billing.
    Payments,
    /// Matching and quoting.
    Matching,
}

impl Category {
    /// Every category, in routing-table order.
    pub const ALL: [Self; 5] = [
        Self::UsersAndRoles,
        Self::ServiceCatalog,
        Self::Requests,
        Self::Payments,
        Self::Matching,
    ];

    /// Short stable identifier used in summaries.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::UsersAndRoles => "users",
            Self::ServiceCatalog => "services",
            Self::Requests => "requests",
            Self::Payments => "payments",
            Self::Matching => "matching",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::UsersAndRoles => &[
                "Users and Roles",
                "Users",
                "Roles",
                "Usuarios",
                "Usuarios y Roles",
            ],
            Self::ServiceCatalog => &[
                "Service Catalog",
                "Services",
                "Catalog",
                "Servicios",
                "Catálogo de Servicios",
            ],
            Self::Requests => &[
                "Requests and Search",
                "Requests",
                "Search",
                "Solicitudes",
                "Búsqueda",
                "Solicitudes y Búsqueda",
            ],
            Self::Payments => &[
                "Payments and Billing",
                "Payments",
                "Billing",
                "Pagos",
                "Facturación",
                "Pagos y Facturación",
            ],
            Self::Matching => &[
                "Matching and Quoting",
                "Matching",
                "Quotations",
                "Quotes",
                "Cotizaciones",
                "Matching y Cotizaciones",
            ],
        }
    }

    /// Resolves a category label, ignoring case, punctuation and accents.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let key = normalize_label(label);
        Self::ALL.into_iter().find(|category| {
            category
                .aliases()
                .iter()
                .any(|alias| normalize_label(alias) == key)
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// How an emission's value is derived from the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    /// A fixed delta.
    Constant(f64),
    /// A numeric payload field; 0 when absent or not numeric.
    PayloadField(&'static str),
}

impl Delta {
    /// Evaluates the delta against an event body.
    ///
    /// Payload fields are looked up on the body first and then inside its
    /// `payload` member, where core hub deliveries keep the upstream data.
    /// Numbers and numeric strings are accepted.
    #[must_use]
    pub fn evaluate(self, body: &Value) -> f64 {
        match self {
            Self::Constant(value) => value,
            Self::PayloadField(field) => [&body[field], &body["payload"][field]]
                .into_iter()
                .find_map(numeric)
                .unwrap_or(0.0),
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// One metric observation to append for a routed event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    /// Metric name.
    pub metric: &'static str,
    /// Value derivation.
    pub delta: Delta,
    /// Unit tag.
    pub unit: MetricUnit,
    /// Combination semantics.
    pub period: MetricPeriod,
}

const fn count(metric: &'static str) -> Emission {
    count_by(metric, 1.0)
}

const fn count_by(metric: &'static str, delta: f64) -> Emission {
    Emission {
        metric,
        delta: Delta::Constant(delta),
        unit: MetricUnit::Count,
        period: MetricPeriod::Incremental,
    }
}

const fn daily(metric: &'static str) -> Emission {
    Emission {
        metric,
        delta: Delta::Constant(1.0),
        unit: MetricUnit::Count,
        period: MetricPeriod::Daily,
    }
}

const fn amount(metric: &'static str, field: &'static str) -> Emission {
    Emission {
        metric,
        delta: Delta::PayloadField(field),
        unit: MetricUnit::Currency,
        period: MetricPeriod::Incremental,
    }
}

/// A routing-table entry.
#[derive(Debug)]
pub struct Route {
    /// Category the route belongs to.
    pub category: Category,
    /// Accepted event type labels.
    pub event_types: &'static [&'static str],
    /// Emissions appended for a matching event.
    pub emissions: &'static [Emission],
}

// Routes only live in `ROUTES`, so they compare by address.
impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// The routing table.
pub static ROUTES: &[Route] = &[
    // Users and roles
    Route {
        category: Category::UsersAndRoles,
        event_types: &["UserCreated", "Usuario Creado"],
        emissions: &[count("total_users"), daily("new_users_today")],
    },
    Route {
        category: Category::UsersAndRoles,
        event_types: &["UserUpdated", "Usuario Actualizado"],
        emissions: &[count("user_updates")],
    },
    Route {
        category: Category::UsersAndRoles,
        event_types: &["UserDeactivated", "Usuario Desactivado"],
        emissions: &[count("inactive_users")],
    },
    Route {
        category: Category::UsersAndRoles,
        event_types: &["RoleAssigned", "Rol Asignado"],
        emissions: &[count("role_assignments")],
    },
    // Service catalog
    Route {
        category: Category::ServiceCatalog,
        event_types: &["ServiceCreated", "Servicio Creado"],
        emissions: &[count("total_services"), count("active_services")],
    },
    Route {
        category: Category::ServiceCatalog,
        event_types: &["ServiceUpdated", "Servicio Actualizado"],
        emissions: &[count("service_updates")],
    },
    Route {
        category: Category::ServiceCatalog,
        event_types: &["ServiceDeactivated", "Servicio Desactivado"],
        emissions: &[
            count("inactive_services"),
            count_by("active_services", -1.0),
        ],
    },
    // Requests and search
    Route {
        category: Category::Requests,
        event_types: &["RequestCreated", "Solicitud Creada"],
        emissions: &[count("total_requests"), count("pending_requests")],
    },
    Route {
        category: Category::Requests,
        event_types: &["RequestCompleted", "Solicitud Completada"],
        emissions: &[
            count("completed_requests"),
            count_by("pending_requests", -1.0),
        ],
    },
    Route {
        category: Category::Requests,
        event_types: &["RequestCancelled", "RequestCanceled", "Solicitud Cancelada"],
        emissions: &[
            count("cancelled_requests"),
            count_by("pending_requests", -1.0),
        ],
    },
    Route {
        category: Category::Requests,
        event_types: &["SearchPerformed", "Búsqueda Realizada"],
        emissions: &[count("total_searches")],
    },
    // Payments and billing
    Route {
        category: Category::Payments,
        event_types: &["PaymentApproved", "Pago Aprobado"],
        emissions: &[
            count("successful_payments"),
            amount("total_revenue", "amount"),
        ],
    },
    Route {
        category: Category::Payments,
        event_types: &["PaymentRejected", "Pago Rechazado"],
        emissions: &[count("failed_payments")],
    },
    Route {
        category: Category::Payments,
        event_types: &["RefundIssued", "Reembolso Emitido"],
        emissions: &[
            count("refunds_issued"),
            amount("refunded_amount", "amount"),
        ],
    },
    // Matching and quoting
    Route {
        category: Category::Matching,
        event_types: &["QuotationIssued", "Cotización Emitida"],
        emissions: &[count("quotations_issued")],
    },
    Route {
        category: Category::Matching,
        event_types: &["QuotationAccepted", "Cotización Aceptada"],
        emissions: &[count("quotations_accepted")],
    },
    Route {
        category: Category::Matching,
        event_types: &["QuotationRejected", "Cotización Rechazada"],
        emissions: &[count("quotations_rejected")],
    },
    Route {
        category: Category::Matching,
        event_types: &["MatchFound", "Match Encontrado"],
        emissions: &[count("total_matches")],
    },
];

/// Outcome of looking up an event in the routing table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// The category label is not known.
    UnknownCategory,
    /// The category is known but the event type is not routed.
    UnknownType(Category),
    /// A route matched.
    Matched(&'static Route),
}

/// Looks up the route for a (category, event type) pair.
#[must_use]
pub fn resolve(category: &str, event_type: &str) -> Resolution {
    let Some(category) = Category::from_label(category) else {
        return Resolution::UnknownCategory;
    };
    let key = normalize_label(event_type);
    ROUTES
        .iter()
        .filter(|route| route.category == category)
        .find(|route| route.event_types.iter().any(|t| normalize_label(t) == key))
        .map_or(Resolution::UnknownType(category), Resolution::Matched)
}

/// Every metric a category can emit, first occurrence wins, in table order.
#[must_use]
pub fn metrics_for(category: Category) -> Vec<(&'static str, MetricUnit, MetricPeriod)> {
    let mut metrics: Vec<(&'static str, MetricUnit, MetricPeriod)> = Vec::new();
    for emission in ROUTES
        .iter()
        .filter(|route| route.category == category)
        .flat_map(|route| route.emissions)
    {
        if !metrics.iter().any(|(name, _, _)| *name == emission.metric) {
            metrics.push((emission.metric, emission.unit, emission.period));
        }
    }
    metrics
}

/// Lower-cases, strips accents and drops everything but letters and digits.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(char::is_ascii_alphanumeric)
        .collect()
}
