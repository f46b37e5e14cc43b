//! End-to-end tests for the command pipeline.
//!
//! These drive the public API the way a bot does: an inbound message goes
//! through trigger detection, mention rewriting, tokenization, the context
//! cursor and the dispatcher, and replies land on a capturing surface.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use snowcmd::channels::{CaptureSurface, InboundMessage, ReplyKind};
use snowcmd::commands::{
    extract_frames, CommandContext, CommandDecl, CommandEngine, Dispatcher, GroupDecl, Invocation,
    Origin, OriginMask, Registry, Status, PIPE_INPUT,
};
use snowcmd::config::{Config, Messages};
use snowcmd::security::{ConfiguredOwner, PermissionCheck};

// ─────────────────────────────────────────────────────────────────────────────
// Test infrastructure
// ─────────────────────────────────────────────────────────────────────────────

const BOT: u64 = 123_456_789_012_345_678;
const OWNER: u64 = 1;
const ALICE: u64 = 2;
const BOB: u64 = 3;
const GUILD: u64 = 500;

/// Grants held as (user, permission) pairs; `*` grants everything.
#[derive(Default)]
struct GrantTable {
    grants: HashSet<(u64, String)>,
    calls: Mutex<Vec<String>>,
}

impl GrantTable {
    fn grant(mut self, user: u64, permission: &str) -> Self {
        self.grants.insert((user, permission.to_string()));
        self
    }
}

impl PermissionCheck for GrantTable {
    fn has_permission(&self, guild_id: u64, user_id: u64, permission: &str) -> bool {
        self.calls.lock().push(format!("{guild_id}/{user_id}/{permission}"));
        self.grants.contains(&(user_id, permission.to_string()))
            || self.grants.contains(&(user_id, "*".to_string()))
    }

    fn name(&self) -> &str {
        "grant-table"
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.bot.self_id = BOT;
    config.bot.owner_id = OWNER;
    config.bot.tag = "?".into();
    config
}

fn engine(trace: &Arc<Mutex<Vec<String>>>, grants: GrantTable) -> CommandEngine {
    let trace_sum = Arc::clone(trace);
    let trace_lines = Arc::clone(trace);

    CommandEngine::with_builtins(&config(), move |builder| {
        builder
            .command(
                CommandDecl::new("sum")
                    .origin(OriginMask::ALL)
                    .usage("<numbers...>")
                    .description("Add numbers, including a piped one"),
                move |ctx, _| {
                    let mut total = ctx.get_i64_or(PIPE_INPUT, 0);
                    for i in 0..ctx.argc() {
                        total += ctx.get_i64(i)?;
                    }
                    trace_sum.lock().push(format!("sum={total}"));
                    ctx.output(&total.to_string());
                    Ok(())
                },
            )
            .command(
                CommandDecl::new("lines").origin(OriginMask::ALL),
                move |ctx, _| {
                    let lines: Vec<String> = ctx.lines().iter().map(|l| l.join("+")).collect();
                    trace_lines.lock().push(lines.join(" / "));
                    Ok(())
                },
            )
            .group(GroupDecl::new("music").origin_str("server"))
            .command(
                CommandDecl::new("play")
                    .parent("music")
                    .alias("p")
                    .origin_str("server")
                    .usage("<track>")
                    .permissions("music.play"),
                |ctx, _| {
                    let track = ctx.join_args(" ");
                    ctx.output(&format!("now playing {track}"));
                    Ok(())
                },
            )
            .command(
                CommandDecl::new("skip")
                    .parent("music")
                    .origin_str("server")
                    .permissions("music.skip, music.queue"),
                |ctx, _| {
                    ctx.output("skipped");
                    Ok(())
                },
            )
    })
    .unwrap()
    .permissions(Arc::new(grants))
}

fn chat(origin: Origin, author_id: u64, content: &str) -> InboundMessage {
    InboundMessage {
        id: "msg".into(),
        origin,
        author_id,
        guild_id: (origin == Origin::Guild).then_some(GUILD),
        content: content.into(),
        timestamp: 1_700_000_000,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer contract
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn tokenizer_contract() {
    let chain = extract_frames("stop").unwrap();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain.first().args(), &["stop"]);
    assert!(chain.first().line_breaks().is_empty());

    let chain = extract_frames(r#"echo "a b" c"#).unwrap();
    assert_eq!(chain.first().args(), &["echo", "a b", "c"]);

    let chain = extract_frames("a | b | c").unwrap();
    let firsts: Vec<&str> = chain.frames().iter().map(|f| f.args()[0].as_str()).collect();
    assert_eq!(firsts, vec!["a", "b", "c"]);

    assert!(extract_frames("  \n ").is_none());
    assert!(extract_frames("a || b").is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipelines
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn piped_numbers_flow_through_stages() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());
    let capture = CaptureSurface::new();

    let status = e.handle(&chat(Origin::Private, ALICE, "?sum 1 2 | sum 10 | sum"), capture.boxed());

    assert_eq!(status, Some(Status::Success));
    assert_eq!(*trace.lock(), vec!["sum=3", "sum=13", "sum=13"]);
    assert_eq!(capture.texts(), vec!["13"]);
}

#[test]
fn failing_stage_stops_pipeline_and_notifies() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());
    let capture = CaptureSurface::new();

    let status = e.handle(&chat(Origin::Private, ALICE, "?sum 1 x | sum 5"), capture.boxed());

    assert_eq!(status, Some(Status::Error));
    assert!(trace.lock().is_empty());
    assert_eq!(capture.failures(), 1);
}

#[test]
fn builtins_compose_with_custom_commands() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());
    let capture = CaptureSurface::new();

    e.handle(
        &chat(Origin::Private, ALICE, "?echo one two three | text count | sum 4"),
        capture.boxed(),
    );

    assert_eq!(capture.texts(), vec!["7"]);
}

#[test]
fn multi_line_input_keeps_line_structure() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());

    e.handle(
        &chat(Origin::Private, ALICE, "?lines a b\nc\n\n\"d\ne\" f"),
        CaptureSurface::new().boxed(),
    );

    assert_eq!(*trace.lock(), vec!["a+b / c / d\ne+f"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn mention_invocation_rewrites_user_mentions() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());
    let capture = CaptureSurface::new();

    let status = e.handle(
        &chat(
            Origin::Private,
            ALICE,
            "<@123456789012345678> echo hi <@!987654321098765432> in <#111111111111111111>",
        ),
        capture.boxed(),
    );

    assert_eq!(status, Some(Status::Success));
    assert_eq!(
        capture.texts(),
        vec!["hi 987654321098765432 in 111111111111111111"]
    );
}

#[test]
fn text_without_trigger_is_not_a_command() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());

    assert_eq!(
        e.handle(&chat(Origin::Guild, ALICE, "sum 1 2"), CaptureSurface::new().boxed()),
        None
    );
    assert_eq!(
        e.handle(&chat(Origin::Guild, ALICE, "<@999999999999999999> sum 1"), CaptureSurface::new().boxed()),
        None
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Access control
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn guild_permissions_are_checked_in_order() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let grants = GrantTable::default()
        .grant(ALICE, "music.play")
        .grant(ALICE, "music.skip");
    let e = engine(&trace, grants);

    let capture = CaptureSurface::new();
    let status = e.handle(&chat(Origin::Guild, ALICE, "?music play intro"), capture.boxed());
    assert_eq!(status, Some(Status::Success));
    assert_eq!(capture.texts(), vec!["now playing intro"]);

    let capture = CaptureSurface::new();
    let status = e.handle(&chat(Origin::Guild, ALICE, "?music skip"), capture.boxed());
    assert_eq!(status, Some(Status::PermError));
    assert_eq!(
        capture.of_kind(ReplyKind::Warn),
        vec!["You need to have permission \"music.queue\" to execute this command"]
    );

    let capture = CaptureSurface::new();
    let status = e.handle(&chat(Origin::Guild, BOB, "?p intro | echo never"), capture.boxed());
    assert_eq!(status, Some(Status::PermError));
    assert_eq!(capture.of_kind(ReplyKind::Warn).len(), 1);
    assert!(capture.of_kind(ReplyKind::Reply).is_empty());
}

#[test]
fn guild_only_group_rejects_private_messages() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default().grant(ALICE, "*"));
    let capture = CaptureSurface::new();

    let status = e.handle(&chat(Origin::Private, ALICE, "?music play x"), capture.boxed());

    assert_eq!(status, Some(Status::PermError));
    assert_eq!(capture.texts(), vec![Messages::default().no_private]);
}

#[test]
fn owner_only_commands_look_missing_to_others() {
    let trace = Arc::new(Mutex::new(Vec::new()));
    let e = engine(&trace, GrantTable::default());

    let capture = CaptureSurface::new();
    assert_eq!(
        e.handle(&chat(Origin::Guild, ALICE, "?stop"), capture.boxed()),
        Some(Status::NotFound)
    );
    assert!(capture.replies().is_empty());
    assert!(!e.shutdown_requested());

    assert_eq!(
        e.handle(&chat(Origin::Guild, OWNER, "?stop"), CaptureSurface::new().boxed()),
        Some(Status::Success)
    );
    assert!(e.shutdown_requested());
}

// ─────────────────────────────────────────────────────────────────────────────
// Using the dispatcher directly
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn dispatcher_can_be_driven_without_engine() {
    let registry = Registry::builder()
        .command(CommandDecl::new("greet").origin(OriginMask::ALL), |ctx, _| {
            let name = ctx.arg(0).unwrap_or("world").to_string();
            ctx.reply(&format!("hello {name}"));
            Ok(())
        })
        .build()
        .unwrap();
    let messages = Messages::default();
    let owner = ConfiguredOwner(OWNER);
    let checker = GrantTable::default();
    let dispatcher = Dispatcher::new(&registry, &checker, &owner, &messages);

    let capture = CaptureSurface::new();
    let mut ctx =
        CommandContext::from_line("greet bob", Invocation::console(OWNER), capture.boxed()).unwrap();

    assert_eq!(dispatcher.run_pipeline(&mut ctx), Status::Success);
    assert_eq!(capture.texts(), vec!["hello bob"]);
    assert!(checker.calls.lock().is_empty());
}
