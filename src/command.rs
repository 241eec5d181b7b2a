// Line commands understood by the terminal shell.
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// One input line. The line is split shell-style first, so values with
/// spaces can be quoted.
#[derive(Parser, Debug)]
#[command(
    name = "plaza",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true,
    subcommand_required = true,
    override_usage = "<command> [args]",
    after_help = "<post> and <user> are list numbers from the last listing, or ids."
)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in with the identity provider
    Login,
    /// Sign out
    Logout,
    /// Show your feed
    Feed,
    /// Reload the current view, or a single post
    Refresh { post: Option<String> },
    /// Publish a post (with the attached file, if any)
    Post {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Attach a file to the next post
    Attach { path: PathBuf },
    /// Like or unlike a post
    Like { post: String },
    /// Share a post
    Share { post: String },
    /// Delete one of your posts
    Delete { post: String },
    /// Open the comment thread of a post
    Comments { post: String },
    /// Comment on a post
    Comment {
        post: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Delete one of your comments in the open thread
    Uncomment { comment: String },
    /// List other users, optionally filtered
    Discover {
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Follow or unfollow (the shown profile by default)
    Follow { user: Option<String> },
    /// Show a profile (yours by default)
    Profile { user: Option<String> },
    /// Change profile fields; quote values that contain spaces
    Edit(ProfileEdits),
    /// Apply the profile edits
    Save,
    /// Discard the profile edits
    Cancel,
    /// Show this help
    #[command(visible_alias = "?")]
    Help,
    /// Leave the shell
    #[command(visible_alias = "exit")]
    Quit,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
#[group(required = true, multiple = true)]
pub struct ProfileEdits {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub bio: Option<String>,
    /// New profile photo
    #[arg(long)]
    pub photo: Option<PathBuf>,
    /// New cover photo
    #[arg(long)]
    pub cover: Option<PathBuf>,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let words = shell_words::split(line)
            .map_err(|e| format!("Failed to parse command: {}", e))?;
        if words.is_empty() {
            return Err("empty command".to_string());
        }
        Line::try_parse_from(words)
            .map(|line| line.command)
            .map_err(|e| e.to_string().trim_end().to_string())
    }

    /// Usage text for every command.
    pub fn help() -> String {
        Line::command().render_help().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_grammar_is_consistent() {
        Line::command().debug_assert();
    }

    #[test]
    fn simple_commands() {
        assert_eq!(Command::parse("feed").unwrap(), Command::Feed);
        assert_eq!(Command::parse("  quit  ").unwrap(), Command::Quit);
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
        assert_eq!(
            Command::parse("discover").unwrap(),
            Command::Discover { query: vec![] }
        );
        assert_eq!(
            Command::parse("profile 2").unwrap(),
            Command::Profile {
                user: Some("2".into())
            }
        );
        assert_eq!(
            Command::parse("refresh 1").unwrap(),
            Command::Refresh {
                post: Some("1".into())
            }
        );
    }

    #[test]
    fn post_collects_every_word() {
        assert_eq!(
            Command::parse("post hello world").unwrap(),
            Command::Post {
                text: vec!["hello".into(), "world".into()]
            }
        );
        assert_eq!(
            Command::parse("post \"spaced   out\"").unwrap(),
            Command::Post {
                text: vec!["spaced   out".into()]
            }
        );
        assert_eq!(Command::parse("post").unwrap(), Command::Post { text: vec![] });
    }

    #[test]
    fn comment_splits_target_and_text() {
        assert_eq!(
            Command::parse("comment 3 nice one").unwrap(),
            Command::Comment {
                post: "3".into(),
                text: vec!["nice".into(), "one".into()]
            }
        );
        assert!(Command::parse("comment 3").is_err());
    }

    #[test]
    fn quoted_paths_lose_their_quotes() {
        assert_eq!(
            Command::parse("attach \"/tmp/my photo.png\"").unwrap(),
            Command::Attach {
                path: "/tmp/my photo.png".into()
            }
        );
        assert_eq!(
            Command::parse("edit --cover '/tmp/the sea.jpg'").unwrap(),
            Command::Edit(ProfileEdits {
                cover: Some("/tmp/the sea.jpg".into()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn edit_values_may_contain_equals_signs() {
        assert_eq!(
            Command::parse("edit --bio \"I think e=mc2\"").unwrap(),
            Command::Edit(ProfileEdits {
                bio: Some("I think e=mc2".into()),
                ..Default::default()
            })
        );
        assert_eq!(
            Command::parse("edit --name='Ada Lovelace' --bio=a=b").unwrap(),
            Command::Edit(ProfileEdits {
                name: Some("Ada Lovelace".into()),
                bio: Some("a=b".into()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn bad_input_is_explained() {
        assert!(Command::parse("like").unwrap_err().contains("<POST>"));
        assert!(Command::parse("edit").is_err());
        assert!(Command::parse("edit --age 3").unwrap_err().contains("--age"));
        assert!(Command::parse("dance").unwrap_err().contains("dance"));
        assert!(Command::parse("post \"unterminated")
            .unwrap_err()
            .starts_with("Failed to parse command"));
        assert_eq!(Command::parse("   ").unwrap_err(), "empty command");
    }

    #[test]
    fn help_lists_the_commands() {
        let help = Command::help();
        for name in ["login", "uncomment", "discover", "edit", "quit"] {
            assert!(help.contains(name), "{} missing from help", name);
        }
    }
}
