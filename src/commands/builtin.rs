//! Built-in commands shipped with every registry.
//!
//! - `help [path...]` / `ownerhelp [path...]`: command listing or details
//! - `echo <text...>`: writes its arguments (after any piped text)
//! - `stop`: owner-only, raises the shutdown flag
//! - `text upper|lower|count|repeat`: pipeline-friendly transforms

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::context::CommandContext;
use super::dispatch::Dispatcher;
use super::origin::OriginMask;
use super::registry::{CommandDecl, CommandNode, GroupDecl, Registry, RegistryBuilder};
use crate::util::{monospace, snap_format};

const HELP_ROWS: usize = 7;
const HELP_SPACING: usize = 2;

/// Register the built-in commands on `builder`. `shutdown` is raised by `stop`.
pub fn register_builtins(builder: RegistryBuilder, shutdown: Arc<AtomicBool>) -> RegistryBuilder {
    builder
        .command(
            CommandDecl::new("help")
                .origin(OriginMask::ALL)
                .usage("[command]")
                .description("List commands, or describe one"),
            |ctx, dispatcher| show_help(ctx, dispatcher, false),
        )
        .command(
            CommandDecl::new("ownerhelp")
                .origin_str("all/ownerOnly")
                .usage("[command]")
                .description("List every command, owner-only ones included"),
            |ctx, dispatcher| show_help(ctx, dispatcher, true),
        )
        .command(
            CommandDecl::new("echo")
                .alias("say")
                .origin(OriginMask::ALL)
                .usage("<text...>")
                .description("Repeat the given text"),
            echo,
        )
        .command(
            CommandDecl::new("stop")
                .origin_str("all/ownerOnly")
                .description("Stop the bot"),
            move |ctx, _| {
                tracing::info!(user = ctx.author_id(), origin = %ctx.origin(), "stop requested");
                shutdown.store(true, Ordering::SeqCst);
                ctx.info("Stopping");
                Ok(())
            },
        )
        .group(
            GroupDecl::new("text")
                .origin(OriginMask::ALL)
                .description("Text transforms, usually fed through a pipe"),
        )
        .command(
            CommandDecl::new("upper")
                .parent("text")
                .origin(OriginMask::ALL)
                .usage("<text...>")
                .description("Uppercase the text"),
            |ctx, _| transform(ctx, |text| text.to_uppercase()),
        )
        .command(
            CommandDecl::new("lower")
                .parent("text")
                .origin(OriginMask::ALL)
                .usage("<text...>")
                .description("Lowercase the text"),
            |ctx, _| transform(ctx, |text| text.to_lowercase()),
        )
        .command(
            CommandDecl::new("count")
                .parent("text")
                .origin(OriginMask::ALL)
                .usage("<text...>")
                .description("Count the words of the text"),
            |ctx, _| transform(ctx, |text| text.split_whitespace().count().to_string()),
        )
        .command(
            CommandDecl::new("repeat")
                .parent("text")
                .origin(OriginMask::ALL)
                .usage("<times> <text...>")
                .description("Repeat the text on as many lines"),
            repeat,
        )
}

fn echo(ctx: &mut CommandContext, _: &Dispatcher<'_>) -> anyhow::Result<()> {
    ctx.merge_pipe_and_args(true);
    if ctx.argc() == 0 {
        ctx.warn("Nothing to echo");
        return Ok(());
    }
    let text = ctx.join_args(" ");
    ctx.output(&text);
    Ok(())
}

/// Apply `f` to the piped text followed by the arguments.
fn transform(ctx: &mut CommandContext, f: impl Fn(&str) -> String) -> anyhow::Result<()> {
    ctx.break_on_warning();
    ctx.merge_pipe_and_args(true);
    if ctx.argc() == 0 {
        ctx.warn("No text given");
        return Ok(());
    }
    let text = f(&ctx.join_args(" "));
    ctx.output(&text);
    Ok(())
}

fn repeat(ctx: &mut CommandContext, _: &Dispatcher<'_>) -> anyhow::Result<()> {
    ctx.break_on_warning();
    let times = match ctx.get_i32(0) {
        Ok(n) if (1..=20).contains(&n) => n,
        Ok(n) => {
            ctx.warn(&format!("Repeat count must be between 1 and 20, got {n}"));
            return Ok(());
        }
        Err(e) => {
            ctx.warn(&format!("Usage: text repeat <times> <text...> ({e})"));
            return Ok(());
        }
    };

    ctx.pull_prefix();
    ctx.merge_pipe_and_args(true);
    if ctx.argc() == 0 {
        ctx.warn("No text given");
        return Ok(());
    }
    let text = ctx.join_args(" ");
    for _ in 0..times {
        ctx.output(&text);
    }
    Ok(())
}

fn show_help(
    ctx: &mut CommandContext,
    dispatcher: &Dispatcher<'_>,
    include_owner_only: bool,
) -> anyhow::Result<()> {
    let registry = dispatcher.registry();
    let visible = |node: &CommandNode| include_owner_only || !node.origin().is_owner_only();

    if ctx.argc() == 0 {
        let text = listing("Commands", registry.top_level().into_iter().filter(|n| visible(n)));
        ctx.output(&text);
        return Ok(());
    }

    let path = ctx.join_args(".");
    let Some(node) = find_visible(registry, &path, &visible) else {
        let text = dispatcher.messages().help_not_found_for(&path);
        ctx.warn(&text);
        return Ok(());
    };

    let text = if node.is_group() {
        let mut out = format!("Group \"{}\"", node.path());
        if !node.description().is_empty() {
            out.push_str(": ");
            out.push_str(node.description());
        }
        out.push('\n');
        out.push_str(&listing("Commands", registry.children(node).filter(|n| visible(n))));
        out
    } else {
        describe(node)
    };
    ctx.output(&text);
    Ok(())
}

/// Resolve a dotted path, treating any hidden segment as missing so a
/// child of an owner-only group is as invisible as the group itself.
fn find_visible<'a>(
    registry: &'a Registry,
    path: &str,
    visible: impl Fn(&CommandNode) -> bool,
) -> Option<&'a CommandNode> {
    let mut segments = path.split('.');
    let mut node = registry.lookup(segments.next()?).filter(|n| visible(n))?;
    for segment in segments {
        node = registry.child(node, segment).filter(|n| visible(n))?;
    }
    Some(node)
}

/// Sorted name columns, split into commands and groups.
fn listing<'a>(title: &str, nodes: impl Iterator<Item = &'a CommandNode>) -> String {
    let mut commands = Vec::new();
    let mut groups = Vec::new();
    for node in nodes {
        if node.is_group() {
            groups.push(node.name());
        } else {
            commands.push(node.name());
        }
    }
    commands.sort_unstable();
    groups.sort_unstable();

    let mut sections = Vec::new();
    if !commands.is_empty() {
        sections.push(format!(
            "{title}:\n{}",
            monospace(&snap_format(&commands, HELP_ROWS, HELP_SPACING))
        ));
    }
    if !groups.is_empty() {
        sections.push(format!(
            "Groups:\n{}",
            monospace(&snap_format(&groups, HELP_ROWS, HELP_SPACING))
        ));
    }
    if sections.is_empty() {
        return "No commands available".into();
    }
    sections.join("\n")
}

fn describe(node: &CommandNode) -> String {
    let mut out = format!("Command \"{}\"", node.path());
    if let Some(alias) = node.alias() {
        out.push_str(&format!(" alias \"{alias}\""));
    }
    if !node.usage().is_empty() {
        out.push('\n');
        out.push_str(&monospace(node.usage()));
    }
    if !node.description().is_empty() {
        out.push('\n');
        out.push_str(node.description());
    }
    out
}
