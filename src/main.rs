use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

use plaza::command::Command;
use plaza::config::{Cli, Config};
use plaza::error::{ClientError, ClientResult};
use plaza::identity::LocalIdentityProvider;
use plaza::media::MediaKind;
use plaza::notice::NoticeLevel;
use plaza::service::{InMemoryBackend, Principal};
use plaza::session::SessionManager;
use plaza::shell::{Route, Shell, View};
use plaza::views::{format_date, format_relative, Discovery, Feed, PostList, ProfileEditor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    let config = Config::load(&cli)?;

    // Initialize logging; stdout belongs to the shell
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("Data directory: {}", data_dir.display());

    let backend = InMemoryBackend::new();
    if cli.seed_demo {
        backend.seed_demo().await?;
    }
    tracing::info!("Using in-memory backend");

    let identity = LocalIdentityProvider::new(
        config.identity_path(),
        config.identity.session_hours,
        Url::parse(&config.identity.provider_url)?,
    );
    let session = SessionManager::new(Arc::new(identity), Arc::new(backend), config.media);

    let mut shell = Shell::new(session);
    shell.start().await;
    render(&shell);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            prompt();
            continue;
        }
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => println!("{}", Command::help()),
            Ok(command) => {
                let result = execute(&mut shell, command).await;
                report(&shell, result);
            }
            Err(message) => println!("{}", message),
        }
        prompt();
    }

    Ok(())
}

fn prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn execute(shell: &mut Shell, command: Command) -> ClientResult<()> {
    match command {
        Command::Login => shell.login().await,
        Command::Logout => {
            shell.logout().await;
            Ok(())
        }
        Command::Feed => shell.navigate(Route::Feed).await,
        Command::Refresh { post: None } => match shell.route() {
            Some(route) => shell.navigate(route).await,
            None => Err(ClientError::NotAuthenticated),
        },
        Command::Refresh { post: Some(target) } => {
            let list = post_list(shell)?;
            let id = post_id(list, &target);
            list.reload(&id).await
        }
        Command::Post { text } => {
            let feed = feed(shell).await?;
            feed.composer_mut().set_content(text.join(" "));
            feed.publish().await.map(|_| ())
        }
        Command::Attach { path } => feed(shell).await?.composer_mut().attach_file(&path),
        Command::Like { post: target } => {
            let list = post_list(shell)?;
            let id = post_id(list, &target);
            list.toggle_like(&id).await.map(|_| ())
        }
        Command::Share { post: target } => {
            let list = post_list(shell)?;
            let id = post_id(list, &target);
            list.share(&id).await.map(|_| ())
        }
        Command::Delete { post: target } => {
            let list = post_list(shell)?;
            let id = post_id(list, &target);
            list.delete(&id).await
        }
        Command::Comments { post: target } => {
            let list = post_list(shell)?;
            let id = post_id(list, &target);
            list.open_comments(&id).await.map(|_| ())
        }
        Command::Comment { post, text } => {
            let list = post_list(shell)?;
            let id = post_id(list, &post);
            if list.comments().map(|t| t.post_id()) != Some(id.as_str()) {
                list.open_comments(&id).await?;
            }
            list.add_comment(&text.join(" ")).await.map(|_| ())
        }
        Command::Uncomment { comment: target } => {
            let list = post_list(shell)?;
            let thread = list
                .comments()
                .ok_or_else(|| ClientError::validation("Open a comment thread first"))?;
            let id = pick(&target, thread.comments(), |c| c.id.clone())
                .unwrap_or(target);
            list.delete_comment(&id).await
        }
        Command::Discover { query } => {
            let discovery = discovery(shell).await?;
            discovery.set_query(query.join(" "));
            Ok(())
        }
        Command::Follow { user: target } => match (shell.view_mut(), target) {
            (Some(View::Discover(discovery)), Some(target)) => {
                let user = user_id(discovery, &target);
                discovery.toggle_follow(&user).await.map(|_| ())
            }
            (Some(View::Profile(profile)), None) => profile.toggle_follow().await.map(|_| ()),
            _ => Err(ClientError::validation(
                "Use 'follow <user>' in discover or 'follow' on a profile",
            )),
        },
        Command::Profile { user: target } => {
            let user = match (shell.view(), target) {
                (_, None) => None,
                (Some(View::Discover(discovery)), Some(target)) => Some(user_id(discovery, &target)),
                (_, Some(target)) => Some(Principal::new(target)),
            };
            shell.navigate(Route::Profile(user)).await
        }
        Command::Edit(edits) => {
            let editor = editor(shell).await?;
            if let Some(path) = edits.photo {
                editor.choose_photo_file(MediaKind::ProfilePhoto, &path)?;
            }
            if let Some(path) = edits.cover {
                editor.choose_photo_file(MediaKind::CoverPhoto, &path)?;
            }
            let draft = editor.draft_mut();
            if let Some(name) = edits.name {
                draft.name = name;
            }
            if let Some(username) = edits.username {
                draft.username = username;
            }
            if let Some(bio) = edits.bio {
                draft.bio = bio;
            }
            Ok(())
        }
        Command::Save => shell.save_profile().await.map(|_| ()),
        Command::Cancel => shell.cancel_edit().await,
        Command::Help | Command::Quit => Ok(()),
    }
}

/// Print the outcome: pending notices first, then the error if nothing
/// was already said about it, then the current view.
fn report(shell: &Shell, result: ClientResult<()>) {
    let notices = shell.session().notices().drain();
    for notice in &notices {
        match notice.level {
            NoticeLevel::Info => println!("* {}", notice.message),
            NoticeLevel::Error => println!("! {}", notice.message),
        }
    }
    match result {
        Ok(()) => render(shell),
        Err(e) => {
            tracing::debug!("Command failed: {}", e);
            if notices.is_empty() {
                println!("! {}", e);
            }
        }
    }
}

async fn feed(shell: &mut Shell) -> ClientResult<&mut Feed> {
    if !matches!(shell.view(), Some(View::Feed(_))) {
        shell.navigate(Route::Feed).await?;
    }
    match shell.view_mut() {
        Some(View::Feed(feed)) => Ok(feed),
        _ => Err(ClientError::NotAuthenticated),
    }
}

async fn discovery(shell: &mut Shell) -> ClientResult<&mut Discovery> {
    if !matches!(shell.view(), Some(View::Discover(_))) {
        shell.navigate(Route::Discover).await?;
    }
    match shell.view_mut() {
        Some(View::Discover(discovery)) => Ok(discovery),
        _ => Err(ClientError::NotAuthenticated),
    }
}

async fn editor(shell: &mut Shell) -> ClientResult<&mut ProfileEditor> {
    if !matches!(shell.view(), Some(View::EditProfile(_))) {
        shell.navigate(Route::EditProfile).await?;
    }
    match shell.view_mut() {
        Some(View::EditProfile(editor)) => Ok(editor),
        _ => Err(ClientError::NotAuthenticated),
    }
}

fn post_list(shell: &mut Shell) -> ClientResult<&mut PostList> {
    match shell.view_mut() {
        Some(View::Feed(feed)) => Ok(feed.posts_mut()),
        Some(View::Profile(profile)) => Ok(profile.posts_mut()),
        _ => Err(ClientError::validation("Open the feed or a profile first")),
    }
}

/// 1-based position in a listing, resolved to an id.
fn pick<T>(target: &str, items: &[T], id: impl Fn(&T) -> String) -> Option<String> {
    let index = target.parse::<usize>().ok()?.checked_sub(1)?;
    items.get(index).map(id)
}

fn post_id(list: &PostList, target: &str) -> String {
    pick(target, list.cards(), |c| c.post.id.clone()).unwrap_or_else(|| target.to_string())
}

fn user_id(discovery: &Discovery, target: &str) -> Principal {
    let visible = discovery.visible();
    pick(target, &visible, |u| u.id.to_string())
        .map(Principal::new)
        .unwrap_or_else(|| Principal::new(target))
}

fn render(shell: &Shell) {
    let now = Utc::now();
    match shell.view() {
        None => println!("Not signed in. Type 'login' to start, 'help' for commands."),
        Some(View::Feed(feed)) => {
            println!("== Feed ==");
            if let Some(upload) = feed.composer().attachment() {
                println!("(attached {}, {} bytes)", upload.mime_type, upload.bytes.len());
            }
            print_posts(feed.posts(), now);
        }
        Some(View::Profile(view)) => {
            match view.profile() {
                Some(profile) => {
                    println!("== {} (@{}) ==", profile.name, profile.username);
                    if !profile.bio.is_empty() {
                        println!("{}", profile.bio);
                    }
                    println!(
                        "{} followers | {} following | {} posts | joined {}",
                        profile.followers_count,
                        profile.following_count,
                        profile.posts_count,
                        format_date(profile.created_at)
                    );
                    if view.photo().is_some() || view.cover().is_some() {
                        println!(
                            "photo: {} | cover: {}",
                            if view.photo().is_some() { "yes" } else { "no" },
                            if view.cover().is_some() { "yes" } else { "no" }
                        );
                    }
                }
                None => println!("== Profile not found =="),
            }
            if !view.is_own() {
                println!(
                    "{}",
                    if view.is_following() { "[following]" } else { "[not following]" }
                );
            }
            print_posts(view.posts(), now);
        }
        Some(View::EditProfile(editor)) => {
            let draft = editor.draft();
            println!("== Edit profile ==");
            println!("name: {}", draft.name);
            println!("username: {}", draft.username);
            println!("bio: {}", draft.bio);
            if let Some(photo) = &draft.profile_photo {
                println!("new photo: {} bytes", photo.bytes.len());
            }
            if let Some(cover) = &draft.cover_photo {
                println!("new cover: {} bytes", cover.bytes.len());
            }
            println!("('save' to apply, 'cancel' to discard)");
        }
        Some(View::Discover(discovery)) => {
            println!("== Discover ==");
            let visible = discovery.visible();
            if visible.is_empty() {
                println!("(no users)");
            }
            for (i, user) in visible.iter().enumerate() {
                println!(
                    "{}. {} (@{}) {} followers{}",
                    i + 1,
                    user.name,
                    user.username,
                    user.followers_count,
                    if discovery.is_following(&user.id) { " [following]" } else { "" }
                );
            }
        }
    }
}

fn print_posts(list: &PostList, now: DateTime<Utc>) {
    if list.is_empty() {
        println!("(no posts yet)");
        return;
    }
    for (i, card) in list.cards().iter().enumerate() {
        let post = &card.post;
        println!(
            "{}. {} - {}",
            i + 1,
            list.author_name(&post.author),
            format_relative(post.created_at, now)
        );
        if !post.content.is_empty() {
            println!("   {}", post.content);
        }
        if let Some(media) = &card.media {
            println!(
                "   [{}, {} bytes]",
                media.mime_type.as_deref().unwrap_or("media"),
                media.len()
            );
        }
        println!(
            "   likes {}{} | comments {} | shares {}",
            post.likes_count,
            if card.liked { " (liked)" } else { "" },
            post.comments_count,
            post.shares_count
        );

        if let Some(thread) = list.comments().filter(|t| t.post_id() == post.id) {
            for (j, comment) in thread.comments().iter().enumerate() {
                println!(
                    "     {}. {} - {}: {}{}",
                    j + 1,
                    thread.author_name(comment),
                    format_relative(comment.created_at, now),
                    comment.content,
                    if thread.can_delete(comment) { " (yours)" } else { "" }
                );
            }
        }
    }
}
