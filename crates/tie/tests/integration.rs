//! End-to-end rendering through the process-wide registry and explicit
//! registries.

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;
use tie::{
    default_tags, register, reset_registry, set_registry, Context, DefaultRenderer,
    PriorityTagManager, RegistryConfig, RegistryRenderer, Strategy, Tag, TagManager, TagMatch,
    TagRegistry, Template, TemplateSet, TieError,
};

fn write(dir: &std::path::Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::File::create(path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
}

// ============================================================================
// Process-wide registry
// ============================================================================

#[test]
#[serial]
fn render_with_single_default_tag() {
    reset_registry();
    register([r"%\w+%"]).unwrap();

    let ctx = Context::new().with("%dummytag%", "dummyval");
    let out = Template::new("dum %dummytag% dum").render(&ctx).unwrap();
    assert_eq!(out, "dum dummyval dum");
    reset_registry();
}

#[test]
#[serial]
fn render_with_three_default_tags() {
    reset_registry();
    register(["%dummytag%", r"\{muddytag\}", "--dumdum--"]).unwrap();

    let ctx = Context::new()
        .with("%dummytag%", "dummyval")
        .with("{muddytag}", "foo")
        .with("--dumdum--", "bar");
    let out = Template::new("--dumdum-- %dummytag% {muddytag}")
        .render(&ctx)
        .unwrap();
    assert_eq!(out, "bar dummyval foo");
    reset_registry();
}

#[test]
#[serial]
fn empty_default_registry_falls_back_to_interpolation() {
    reset_registry();
    assert!(default_tags().is_empty());

    let ctx = Context::new().with("name", "Bob");
    assert_eq!(Template::new("Hello {name}").render(&ctx).unwrap(), "Hello Bob");
}

#[test]
#[serial]
fn tags_registered_after_template_creation_apply() {
    reset_registry();
    let template = Template::new("hi %who%");
    register([r"%(\w+)%"]).unwrap();

    let out = template.render(&Context::new().with("who", "you")).unwrap();
    assert_eq!(out, "hi you");
    reset_registry();
}

#[test]
#[serial]
fn swapped_priority_registry_orders_chained_rendering() {
    let mut registry = PriorityTagManager::new();
    // Runs second: picks up the text produced by the first tag.
    registry.add_with_priority(r"<(\w+)>", 10).unwrap();
    let first = |_: &TagMatch<'_>, _: &Context| -> tie::Result<String> { Ok("<b>".to_string()) };
    registry
        .add_with_priority(Tag::new("@a").unwrap().with_processor(first), 1)
        .unwrap();
    set_registry(Box::new(registry));

    let ctx = Context::new().with("b", "bee");
    let chained = Template::new("@a").with_renderer(DefaultRenderer::with_strategy(Strategy::Chained));
    assert_eq!(chained.render(&ctx).unwrap(), "bee");
    let combined = Template::new("@a");
    assert_eq!(combined.render(&ctx).unwrap(), "<b>");
    reset_registry();
}

#[test]
#[serial]
fn invalid_registration_surfaces() {
    reset_registry();
    assert!(matches!(
        register(["(unclosed"]),
        Err(TieError::InvalidPattern { .. })
    ));
    assert!(default_tags().is_empty());
}

// ============================================================================
// Explicit registries
// ============================================================================

#[test]
fn missing_variable_degrades_with_one_warning() {
    let mut tags = TagManager::new();
    tags.add(r"%(\w+)%".into()).unwrap();
    let template = Template::new("Dear %name%, %name%!").with_renderer(RegistryRenderer::new(tags));

    let out = template.render(&Context::new()).unwrap();
    assert_eq!(out, "Dear , !");
    assert_eq!(out.warnings().len(), 1);
    assert_eq!(
        out.warnings()[0].to_string(),
        "No context variable matched the tag name"
    );
}

#[test]
fn path_expressions_resolve_or_fail() {
    let mut tags = TagManager::new();
    tags.add(r"\{\{ (.+?) \}\}".into()).unwrap();
    let renderer = RegistryRenderer::new(tags);
    let ctx = Context::new()
        .with("items", json!([10, 20, 30]))
        .with("user", json!({"name": "Bob", "meta": {"build dir": "/tmp"}}));

    let ok = Template::new("{{ items[1] }} {{ user.name }} {{ user.meta['build dir'] }}")
        .with_renderer(renderer.clone());
    assert_eq!(ok.render(&ctx).unwrap(), "20 Bob /tmp");

    let bad = Template::new("{{ items[5] }}").with_renderer(renderer);
    assert!(matches!(bad.render(&ctx), Err(TieError::Lookup(_))));
}

#[test]
fn shared_registry_between_renderers() {
    let mut tags = TagManager::new();
    tags.add("--dumdum--".into()).unwrap();
    let shared: Arc<dyn TagRegistry> = Arc::new(tags);

    let a = Template::new("a --dumdum--").with_renderer(RegistryRenderer::shared(Arc::clone(&shared)));
    let b = Template::new("b --dumdum--").with_renderer(RegistryRenderer::shared(shared));
    let ctx = Context::new().with("--dumdum--", "x");
    assert_eq!(a.render(&ctx).unwrap(), "a x");
    assert_eq!(b.render(&ctx).unwrap(), "b x");
}

#[test]
fn concurrent_renders_share_one_registry() {
    let mut tags = TagManager::new();
    tags.add(Tag::new(r"%(\w+)%").unwrap().cached().into()).unwrap();
    tags.add(r"<(\w+)>".into()).unwrap();
    let shared: Arc<dyn TagRegistry> = Arc::new(tags);
    let ctx = Context::new().with("greeting", "hello").with("who", "world");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let template = Template::new("%greeting% <who>")
                    .with_renderer(RegistryRenderer::shared(Arc::clone(&shared)));
                let ctx = &ctx;
                scope.spawn(move || {
                    (0..50)
                        .map(|_| template.render(ctx).unwrap().into_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            for out in handle.join().unwrap() {
                assert_eq!(out, "hello world");
            }
        }
    });
    assert_eq!(shared.tags()[0].cache_len(), 1);
}

#[test]
fn render_does_not_touch_context_or_template() {
    let mut tags = TagManager::new();
    tags.add(r"%(\w+)%".into()).unwrap();
    let template = Template::new("%a% %b%").with_renderer(RegistryRenderer::new(tags));
    let ctx = Context::new().with("a", 1).with("b", 2);

    let first = template.render(&ctx).unwrap();
    let second = template.render(&ctx).unwrap();
    assert_eq!(first, second);
    assert_eq!(template.source(), "%a% %b%");
    assert_eq!(ctx.len(), 2);
}

// ============================================================================
// Configuration and template sets
// ============================================================================

#[test]
fn configured_registry_renders_loaded_templates() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "tags.yaml", "tags:\n  - pattern: '%(\\w+)%'\n  - pattern: '<<(\\S+)>>'\n    priority: -1\n");
    write(dir.path(), "templates/greeting.txt", "Hello %name% from <<city.name>>");
    write(dir.path(), "templates/mail/footer.txt", "-- %name%");

    let registry = RegistryConfig::from_file(dir.path().join("tags.yaml"))
        .unwrap()
        .build()
        .unwrap();
    let mut set = TemplateSet::new().with_renderer(RegistryRenderer::new(registry));
    assert_eq!(set.load_dir(dir.path().join("templates"), true).unwrap(), 2);

    let ctx = Context::new()
        .with("name", "raphi")
        .with("city", json!({"name": "Zurich"}));
    assert_eq!(set.render("greeting", &ctx).unwrap(), "Hello raphi from Zurich");
    assert_eq!(set.render("footer", &ctx).unwrap(), "-- raphi");
    assert!(matches!(
        set.render("header", &ctx),
        Err(TieError::TemplateNotFound(_))
    ));
}
