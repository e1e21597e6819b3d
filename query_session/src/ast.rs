//! The typed SELECT tree the hand-rolled parser produces and the rewrite
//! plugins rewrite in place. Deliberately small: full SQL grammar is out of
//! scope, but *some* typed representation has to stand between the surface
//! text and the per-chunk templates.

/// A scalar expression appearing in the select list, GROUP BY, HAVING, or
/// ORDER BY. WHERE-clause predicates are kept as whole conjunct strings (see
/// [`Conjunct`]) rather than expression trees, since they're never rewritten
/// piece-by-piece - only extracted, replaced wholesale, or left alone.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Star,
    Column(String),
    Literal(String),
    /// A function call, e.g. `avg(taiMidPoint)` or `count(*)`.
    Func { name: String, args: Vec<Expr> },
    /// `a/b`. The aggregate-rewrite plugin's only non-function output, used
    /// for `avg`'s merge-side ratio of sums - otherwise not produced by the
    /// parser, since arithmetic expressions are outside this system's
    /// grammar subset.
    Div(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn render(&self) -> String {
        match self {
            Expr::Star => "*".to_string(),
            Expr::Column(c) => c.clone(),
            Expr::Literal(l) => l.clone(),
            Expr::Func { name, args } => {
                let args = args.iter().map(Expr::render).collect::<Vec<_>>().join(", ");
                format!("{}({})", name, args)
            }
            Expr::Div(lhs, rhs) => format!("{}/{}", lhs.render(), rhs.render()),
        }
    }

    /// True for the handful of aggregate functions the aggregate-rewrite
    /// plugin recognizes.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Func { name, .. } if matches!(
            name.to_ascii_uppercase().as_str(),
            "COUNT" | "SUM" | "AVG" | "MIN" | "MAX"
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn render(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", self.expr.render(), alias),
            None => self.expr.render(),
        }
    }
}

/// A table reference in the FROM clause: `db.table [AS alias]`. Qserv always
/// requires the owning database to be resolvable (either qualified here or
/// filled in from the session's default database during analysis).
#[derive(Clone, Debug, PartialEq)]
pub struct TableRef {
    pub db: Option<String>,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn effective_alias(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub fn render(&self, db_override: Option<&str>) -> String {
        let db = db_override.or(self.db.as_deref()).unwrap_or("");
        let base = if db.is_empty() {
            self.table.clone()
        } else {
            format!("{}.{}", db, self.table)
        };
        match &self.alias {
            Some(alias) => format!("{} AS {}", base, alias),
            None => base,
        }
    }
}

/// One top-level `AND`-joined conjunct of the WHERE clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Conjunct {
    /// A `qserv_areaspec_box/circle/ellipse/poly(...)` call, recognized by
    /// the area-restrictor plugin and replaced with the equivalent sciSQL
    /// row filter (or dropped, if the plugin hasn't run yet).
    AreaSpec { func: String, args: Vec<String> },
    /// Any other conjunct, kept as literal SQL text. This also covers
    /// secondary-index-eligible predicates (`col IN (...)`/`col BETWEEN`):
    /// the secondary-index plugin inspects these without removing them,
    /// since the director-table lookup narrows chunks but does not replace
    /// the need for row-level filtering.
    Raw(String),
}

impl Conjunct {
    pub fn render(&self) -> String {
        match self {
            Conjunct::AreaSpec { func, args } => format!("{}({})", func, args.join(",")),
            Conjunct::Raw(text) => text.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}

impl OrderItem {
    pub fn render(&self) -> String {
        format!("{} {}", self.expr.render(), if self.descending { "DESC" } else { "ASC" })
    }
}

/// The logical SELECT tree the parser produces and the plugin chain
/// rewrites. A single `SelectStmt` plays three roles over a session's
/// lifetime: the original analyzed statement, each parallel-template
/// statement, and the merge statement - distinguished only by which fields
/// are populated.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SelectStmt {
    pub distinct: bool,
    pub select_list: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub where_clause: Vec<Conjunct>,
    pub group_by: Vec<String>,
    pub having: Option<String>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

impl SelectStmt {
    pub fn render(&self) -> String {
        let mut out = String::from("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        if self.select_list.is_empty() {
            out.push('*');
        } else {
            out.push_str(
                &self
                    .select_list
                    .iter()
                    .map(SelectItem::render)
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        out.push_str(" FROM ");
        out.push_str(
            &self
                .from
                .iter()
                .map(|t| t.render(None))
                .collect::<Vec<_>>()
                .join(", "),
        );
        if !self.where_clause.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(
                &self
                    .where_clause
                    .iter()
                    .map(Conjunct::render)
                    .collect::<Vec<_>>()
                    .join(" AND "),
            );
        }
        if !self.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            out.push_str(&self.group_by.join(", "));
        }
        if let Some(having) = &self.having {
            out.push_str(" HAVING ");
            out.push_str(having);
        }
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            out.push_str(
                &self
                    .order_by
                    .iter()
                    .map(OrderItem::render)
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!(" LIMIT {}", limit));
        }
        out
    }
}
