//! Built-in syntactic analyzer for single-file components.
//!
//! Reads the macros of `<script setup>` (`defineProps`, `withDefaults`,
//! `defineEmits`, `defineSlots`, `defineExpose`) with swc and the `<slot>`
//! tags of `<template>`. No type resolution beyond interfaces and type
//! aliases declared in the same script.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use swc_common::{sync::Lrc, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::*;
use swc_ecma_parser::{EsConfig, Parser, StringInput, Syntax, TsConfig};
use swc_ecma_visit::{Visit, VisitWith};

use crate::analyzer::adapter::{AnalyzeRequest, Analyzer};
use crate::error::AnalyzerError;

const UNKNOWN: &str = "unknown";

pub struct SfcAnalyzer;

#[async_trait]
impl Analyzer for SfcAnalyzer {
    /// Parsing runs on the blocking pool so the adapter's timeout can fire
    /// and sibling analyses keep progressing.
    async fn analyze(&self, request: AnalyzeRequest) -> Result<Value, AnalyzerError> {
        tokio::task::spawn_blocking(move || analyze_sfc(&request))
            .await
            .map_err(|e| AnalyzerError::Parse(format!("builtin analyzer aborted: {e}")))?
    }

    fn cache_key(&self) -> Option<String> {
        Some(format!("builtin/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Synchronous core of [`SfcAnalyzer`], also used by the CLI `analyze`
/// subcommand.
pub fn analyze_sfc(request: &AnalyzeRequest) -> Result<Value, AnalyzerError> {
    let blocks = SfcBlocks::split(&request.source);
    let filename = request.path.to_string_lossy().to_string();

    let mut extracted = Extracted::default();
    if let Some(script) = &blocks.script {
        let ts = request.force_use_ts || script.lang.as_deref().is_some_and(|l| l.starts_with("ts"));
        let (module, base) = parse_script(&script.content, &filename, ts).map_err(AnalyzerError::Parse)?;

        let mut collector = TypeCollector::default();
        module.visit_with(&mut collector);

        let mut extractor = MacroExtractor {
            src: &script.content,
            base,
            types: &collector.types,
            out: &mut extracted,
        };
        module.visit_with(&mut extractor);
    }
    if extracted.slots.is_empty() {
        if let Some(template) = &blocks.template {
            extracted.slots = template_slots(template);
        }
    }
    extracted.apply_defaults();

    let ignore = |ty: String| {
        if request.ignore.iter().any(|i| *i == ty) {
            UNKNOWN.to_string()
        } else {
            ty
        }
    };

    let mut out = Map::new();
    if request.fields.props {
        let props: Vec<Value> = extracted
            .props
            .into_iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "type": ignore(p.ty),
                    "required": p.required,
                    "default": p.default,
                })
            })
            .collect();
        out.insert("props".to_string(), Value::Array(props));
    }
    for (key, enabled, members) in [
        ("slots", request.fields.slots, extracted.slots),
        ("events", request.fields.events, extracted.events),
        ("exposed", request.fields.exposed, extracted.exposed),
    ] {
        if enabled {
            let list = members
                .into_iter()
                .map(|(name, ty)| json!({ "name": name, "type": ignore(ty) }))
                .collect();
            out.insert(key.to_string(), Value::Array(list));
        }
    }
    Ok(Value::Object(out))
}

struct ScriptBlock {
    content: String,
    lang: Option<String>,
}

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<script\b([^>]*)>(.*?)</script>").expect("script pattern"));
static LANG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\blang\s*=\s*["']([^"']+)["']"#).expect("lang pattern"));
static SETUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)setup(\s|=|$)").expect("setup pattern"));
static SLOT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<slot\b([^>]*?)/?>").expect("slot tag pattern"));
static SLOT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)(v-bind:|:)?([A-Za-z_][\w-]*)(?:\s*=\s*"([^"]*)")?"#).expect("slot attribute pattern")
});

struct SfcBlocks {
    script: Option<ScriptBlock>,
    template: Option<String>,
}

impl SfcBlocks {
    fn split(source: &str) -> Self {
        let mut script: Option<ScriptBlock> = None;
        for caps in SCRIPT_RE.captures_iter(source) {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let block = ScriptBlock {
                content: caps.get(2).map_or("", |m| m.as_str()).to_string(),
                lang: LANG_RE.captures(attrs).map(|c| c[1].to_string()),
            };
            let is_setup = SETUP_RE.is_match(attrs);
            if is_setup || script.is_none() {
                script = Some(block);
            }
            if is_setup {
                break;
            }
        }

        let template = match (source.find("<template"), source.rfind("</template>")) {
            (Some(start), Some(end)) if end > start => Some(source[start..end].to_string()),
            _ => None,
        };

        Self { script, template }
    }
}

fn template_slots(template: &str) -> Vec<(String, String)> {
    let mut slots: Vec<(String, String)> = Vec::new();
    for caps in SLOT_TAG_RE.captures_iter(template) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let mut name = "default".to_string();
        let mut bindings: Vec<String> = Vec::new();
        for a in SLOT_ATTR_RE.captures_iter(attrs) {
            let bound = a.get(1).is_some();
            let key = &a[2];
            match (bound, key) {
                (false, "name") => {
                    if let Some(v) = a.get(3) {
                        name = v.as_str().to_string();
                    }
                }
                (true, "name") => {}
                (true, key) => bindings.push(format!("{key}: any")),
                (false, _) => {}
            }
        }
        if slots.iter().any(|(n, _)| *n == name) {
            continue;
        }
        let shape = if bindings.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", bindings.join("; "))
        };
        slots.push((name, shape));
    }
    slots
}

fn parse_script(source: &str, filename: &str, ts: bool) -> Result<(Module, u32), String> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(Lrc::new(FileName::Custom(filename.to_string())), source.into());
    let base = fm.start_pos.0;
    let input = StringInput::from(&*fm);
    let syntax = if ts {
        Syntax::Typescript(TsConfig {
            tsx: false,
            decorators: true,
            dts: false,
            no_early_errors: true,
            ..Default::default()
        })
    } else {
        Syntax::Es(EsConfig {
            jsx: false,
            decorators: true,
            ..Default::default()
        })
    };
    let mut p = Parser::new(syntax, input, None);
    p.parse_module()
        .map(|m| (m, base))
        .map_err(|e| e.kind().msg().to_string())
}

#[derive(Default)]
struct TypeCollector {
    types: HashMap<String, Vec<TsTypeElement>>,
}

impl Visit for TypeCollector {
    fn visit_ts_interface_decl(&mut self, decl: &TsInterfaceDecl) {
        self.types
            .insert(decl.id.sym.to_string(), decl.body.body.clone());
    }

    fn visit_ts_type_alias_decl(&mut self, decl: &TsTypeAliasDecl) {
        if let TsType::TsTypeLit(lit) = &*decl.type_ann {
            self.types.insert(decl.id.sym.to_string(), lit.members.clone());
        }
    }
}

struct PropOut {
    name: String,
    ty: String,
    required: bool,
    default: Option<String>,
}

#[derive(Default)]
struct Extracted {
    props: Vec<PropOut>,
    defaults: HashMap<String, String>,
    slots: Vec<(String, String)>,
    events: Vec<(String, String)>,
    exposed: Vec<(String, String)>,
}

impl Extracted {
    fn apply_defaults(&mut self) {
        for prop in &mut self.props {
            if let Some(d) = self.defaults.get(&prop.name) {
                prop.default = Some(d.clone());
            }
        }
    }
}

struct MacroExtractor<'a> {
    src: &'a str,
    base: u32,
    types: &'a HashMap<String, Vec<TsTypeElement>>,
    out: &'a mut Extracted,
}

impl MacroExtractor<'_> {
    fn snippet(&self, span: Span) -> String {
        let lo = span.lo.0.saturating_sub(self.base) as usize;
        let hi = span.hi.0.saturating_sub(self.base) as usize;
        self.src
            .get(lo..hi)
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn type_ann_text(&self, ann: &Option<Box<TsTypeAnn>>) -> String {
        ann.as_ref()
            .map(|a| self.snippet(a.type_ann.span()))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// Members of a type literal, or of a same-file interface/alias it names.
    fn members_of(&self, ty: &TsType) -> Vec<TsTypeElement> {
        match ty {
            TsType::TsTypeLit(lit) => lit.members.clone(),
            TsType::TsTypeRef(r) => match &r.type_name {
                TsEntityName::Ident(id) => self.types.get(&*id.sym).cloned().unwrap_or_default(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    fn first_type_arg<'c>(&self, call: &'c CallExpr) -> Option<&'c TsType> {
        call.type_args
            .as_ref()
            .and_then(|args| args.params.first())
            .map(|t| &**t)
    }

    fn define_props(&mut self, call: &CallExpr) {
        if let Some(ty) = self.first_type_arg(call) {
            for member in self.members_of(ty) {
                if let TsTypeElement::TsPropertySignature(sig) = member {
                    if let Some(name) = expr_key(&sig.key) {
                        let ty = self.type_ann_text(&sig.type_ann);
                        self.out.props.push(PropOut {
                            name,
                            ty,
                            required: !sig.optional,
                            default: None,
                        });
                    }
                }
            }
            return;
        }
        match call.args.first().map(|a| &*a.expr) {
            Some(Expr::Array(arr)) => {
                for name in arr.elems.iter().flatten().filter_map(|e| str_lit(&e.expr)) {
                    self.out.props.push(PropOut {
                        name,
                        ty: "any".to_string(),
                        required: false,
                        default: None,
                    });
                }
            }
            Some(Expr::Object(obj)) => {
                for (name, value) in object_entries(obj) {
                    let prop = match value {
                        Some(Expr::Object(opts)) => self.runtime_prop_options(name, opts),
                        Some(other) => PropOut {
                            name,
                            ty: self.runtime_type(other),
                            required: false,
                            default: None,
                        },
                        None => PropOut {
                            name,
                            ty: UNKNOWN.to_string(),
                            required: false,
                            default: None,
                        },
                    };
                    self.out.props.push(prop);
                }
            }
            _ => {}
        }
    }

    fn runtime_prop_options(&self, name: String, opts: &ObjectLit) -> PropOut {
        let mut prop = PropOut {
            name,
            ty: UNKNOWN.to_string(),
            required: false,
            default: None,
        };
        for (key, value) in object_entries(opts) {
            let Some(value) = value else { continue };
            match key.as_str() {
                "type" => prop.ty = self.runtime_type(value),
                "required" => prop.required = matches!(value, Expr::Lit(Lit::Bool(b)) if b.value),
                "default" => prop.default = Some(self.snippet(value.span())),
                _ => {}
            }
        }
        prop
    }

    fn runtime_type(&self, expr: &Expr) -> String {
        match expr {
            Expr::Ident(id) => constructor_type(&id.sym).unwrap_or_else(|| id.sym.to_string()),
            Expr::Array(arr) => arr
                .elems
                .iter()
                .flatten()
                .map(|e| self.runtime_type(&e.expr))
                .collect::<Vec<_>>()
                .join(" | "),
            Expr::TsAs(as_expr) => self.snippet(as_expr.type_ann.span()),
            other => self.snippet(other.span()),
        }
    }

    fn with_defaults(&mut self, call: &CallExpr) {
        if let Some(Expr::Object(obj)) = call.args.get(1).map(|a| &*a.expr) {
            for (name, value) in object_entries(obj) {
                if let Some(value) = value {
                    let text = self.snippet(value.span());
                    self.out.defaults.insert(name, text);
                }
            }
        }
    }

    fn define_emits(&mut self, call: &CallExpr) {
        if let Some(ty) = self.first_type_arg(call) {
            for member in self.members_of(ty) {
                match member {
                    // (e: 'change', value: string): void
                    TsTypeElement::TsCallSignatureDecl(sig) => {
                        let mut params = sig.params.iter();
                        let Some(TsFnParam::Ident(first)) = params.next() else { continue };
                        let Some(name) = first
                            .type_ann
                            .as_ref()
                            .and_then(|a| ts_str_lit(&a.type_ann))
                        else {
                            continue;
                        };
                        let payload: Vec<String> = params
                            .map(|p| match p {
                                TsFnParam::Ident(b) => {
                                    format!("{}: {}", b.id.sym, self.type_ann_text(&b.type_ann))
                                }
                                other => self.snippet(other.span()),
                            })
                            .collect();
                        self.out.events.push((name, format!("[{}]", payload.join(", "))));
                    }
                    // change: [value: string]
                    TsTypeElement::TsPropertySignature(sig) => {
                        if let Some(name) = expr_key(&sig.key) {
                            let ty = self.type_ann_text(&sig.type_ann);
                            self.out.events.push((name, ty));
                        }
                    }
                    _ => {}
                }
            }
            return;
        }
        match call.args.first().map(|a| &*a.expr) {
            Some(Expr::Array(arr)) => {
                for name in arr.elems.iter().flatten().filter_map(|e| str_lit(&e.expr)) {
                    self.out.events.push((name, "any[]".to_string()));
                }
            }
            Some(Expr::Object(obj)) => {
                for (name, _) in object_entries(obj) {
                    self.out.events.push((name, "any[]".to_string()));
                }
            }
            _ => {}
        }
    }

    fn define_slots(&mut self, call: &CallExpr) {
        let Some(ty) = self.first_type_arg(call) else { return };
        for member in self.members_of(ty) {
            let slot = match member {
                TsTypeElement::TsMethodSignature(sig) => expr_key(&sig.key).map(|name| {
                    let shape = match sig.params.first() {
                        Some(TsFnParam::Ident(b)) => self.type_ann_text(&b.type_ann),
                        _ => "{}".to_string(),
                    };
                    (name, shape)
                }),
                TsTypeElement::TsPropertySignature(sig) => {
                    expr_key(&sig.key).map(|name| (name, self.type_ann_text(&sig.type_ann)))
                }
                _ => None,
            };
            if let Some(slot) = slot {
                self.out.slots.push(slot);
            }
        }
    }

    fn define_expose(&mut self, call: &CallExpr) {
        let Some(Expr::Object(obj)) = call.args.first().map(|a| &*a.expr) else { return };
        for (name, value) in object_entries(obj) {
            let ty = match value {
                Some(Expr::Arrow(_)) | Some(Expr::Fn(_)) => "Function".to_string(),
                Some(Expr::Lit(Lit::Str(_))) => "string".to_string(),
                Some(Expr::Lit(Lit::Num(_))) => "number".to_string(),
                Some(Expr::Lit(Lit::Bool(_))) => "boolean".to_string(),
                _ => UNKNOWN.to_string(),
            };
            self.out.exposed.push((name, ty));
        }
    }
}

impl Visit for MacroExtractor<'_> {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if let Callee::Expr(callee) = &call.callee {
            if let Expr::Ident(id) = &**callee {
                match &*id.sym {
                    "defineProps" => self.define_props(call),
                    "withDefaults" => self.with_defaults(call),
                    "defineEmits" => self.define_emits(call),
                    "defineSlots" => self.define_slots(call),
                    "defineExpose" => self.define_expose(call),
                    _ => {}
                }
            }
        }
        call.visit_children_with(self);
    }
}

fn constructor_type(name: &str) -> Option<String> {
    let ty = match name {
        "String" => "string",
        "Number" => "number",
        "Boolean" => "boolean",
        "Array" => "unknown[]",
        "Object" => "Record<string, any>",
        "Function" => "Function",
        "Date" => "Date",
        "Symbol" => "symbol",
        _ => return None,
    };
    Some(ty.to_string())
}

fn expr_key(key: &Expr) -> Option<String> {
    match key {
        Expr::Ident(id) => Some(id.sym.to_string()),
        other => str_lit(other),
    }
}

fn str_lit(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        _ => None,
    }
}

fn ts_str_lit(ty: &TsType) -> Option<String> {
    match ty {
        TsType::TsLitType(TsLitType {
            lit: TsLit::Str(s), ..
        }) => Some(s.value.to_string()),
        _ => None,
    }
}

fn object_entries(obj: &ObjectLit) -> Vec<(String, Option<&Expr>)> {
    obj.props
        .iter()
        .filter_map(|p| match p {
            PropOrSpread::Prop(prop) => match &**prop {
                Prop::KeyValue(kv) => prop_name(&kv.key).map(|n| (n, Some(&*kv.value))),
                Prop::Shorthand(id) => Some((id.sym.to_string(), None)),
                Prop::Method(m) => prop_name(&m.key).map(|n| (n, None)),
                _ => None,
            },
            PropOrSpread::Spread(_) => None,
        })
        .collect()
}

fn prop_name(key: &PropName) -> Option<String> {
    match key {
        PropName::Ident(id) => Some(id.sym.to_string()),
        PropName::Str(s) => Some(s.value.to_string()),
        _ => None,
    }
}
