use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{ArgGroup, Args, Parser, Subcommand};
use dialoguer::Confirm;
use futures::{StreamExt, TryStreamExt};

use docker_remote::config::{DEFAULT_TIMEOUT_SECS, DEFAULT_URL, MAX_PAGE_SIZE};
use docker_remote::{
    ClientConfig, Credentials, DockerHubClient, RegistryApi, RemovalPolicy, RemovalRun,
    RepositoryRef, Session, output, pagination, removal,
};

#[derive(Parser)]
#[command(name = "docker-remote", version, about = "Manage remote Docker Hub repositories", long_about = None)]
pub struct Cli {
    /// Login credentials to the Docker Hub in format `username:password`
    #[arg(short = 'u', long, global = true, value_name = "USER:PASSWORD")]
    pub login: Option<String>,

    /// Verbose output, logs every request to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pretty the output format
    #[arg(long, global = true)]
    pub pretty: bool,

    /// The Docker Hub URL
    #[arg(long, global = true, default_value = DEFAULT_URL, hide = true)]
    pub url: String,

    /// Number of tags requested per page
    #[arg(long, global = true, default_value_t = MAX_PAGE_SIZE)]
    pub page_size: u32,

    /// Timeout of every request, in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search Docker Hub repositories
    #[command(visible_alias = "s")]
    Search(SearchArgs),

    /// Show the description of a Docker Hub repository
    #[command(visible_aliases = ["des", "d"])]
    Description(DescriptionArgs),

    /// List, inspect or remove the tags of a Docker Hub repository
    #[command(visible_alias = "t")]
    Tags(TagsArgs),

    /// Show information about a Docker Hub repository
    #[command(visible_aliases = ["repo", "r"])]
    Repository(RepositoryArgs),
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search phrase e.g. `nginx` or `bitnami/nginx`
    pub query: String,

    /// Output only the number of results
    #[arg(short, long)]
    pub count: bool,

    /// Number of result pages to print
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub number: u32,
}

#[derive(Args)]
#[command(group(ArgGroup::new("length").args(["short", "long", "full"])))]
pub struct DescriptionArgs {
    /// Repository in format `namespace/repository` or `repository`
    pub repository: String,

    /// Select only the short description (default)
    #[arg(long)]
    pub short: bool,

    /// Select only the long description
    #[arg(long)]
    pub long: bool,

    /// Select both the short and the long description
    #[arg(long)]
    pub full: bool,

    /// Set the repository description (not supported)
    #[arg(long, value_name = "DESCRIPTION")]
    pub set: Option<String>,
}

#[derive(Args)]
#[command(group(ArgGroup::new("selection").args(["tag", "all", "keep", "number"])))]
pub struct TagsArgs {
    /// Repository in format `namespace/repository` or `repository`
    pub repository: String,

    /// Remove the selected tags, login is necessary
    #[arg(long)]
    pub remove: bool,

    /// Select a tag by name
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Select all the tags of the repository
    #[arg(short, long, requires = "remove")]
    pub all: bool,

    /// Number of most recent tags to keep, the others are removed
    #[arg(short, long, requires = "remove", allow_negative_numbers = true)]
    pub keep: Option<i64>,

    /// List only the `n` most recent tags
    #[arg(short, long, conflicts_with = "remove")]
    pub number: Option<usize>,

    /// Show only the number of tags
    #[arg(short, long, conflicts_with = "remove")]
    pub count: bool,

    /// Delimiter separating the tags in the plain output
    #[arg(short, long, default_value = " ")]
    pub delim: String,

    /// Automatically answer `yes` to the confirmation
    #[arg(short = 'y', long = "assumeyes", conflicts_with = "assume_no")]
    pub assume_yes: bool,

    /// Automatically answer `no` to the confirmation
    #[arg(long = "assumeno")]
    pub assume_no: bool,
}

#[derive(Args)]
pub struct RepositoryArgs {
    /// Repository in format `namespace/repository` or `repository`
    pub repository: String,

    /// Show only the total size of all tags
    #[arg(short, long)]
    pub size: bool,
}

impl TagsArgs {
    fn policy(&self) -> anyhow::Result<RemovalPolicy> {
        let policy = match (&self.tag, self.all, self.keep) {
            (Some(tag), _, _) => RemovalPolicy::single(tag)?,
            (None, true, _) => RemovalPolicy::RemoveAll,
            (None, false, Some(n)) => RemovalPolicy::keep_last(n)?,
            (None, false, None) => bail!("--remove needs one of --tag, --all or --keep"),
        };
        Ok(policy)
    }

    fn answer(&self) -> Option<bool> {
        match (self.assume_yes, self.assume_no) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ClientConfig::new(&cli.url, cli.page_size, cli.timeout)?;
    let dh = DockerHubClient::new(&config)?;

    let session = match &cli.login {
        Some(login) => {
            let credentials: Credentials = login.parse()?;
            let session = dh
                .authenticate(&credentials)
                .await
                .context("failed logging into the docker hub")?;
            Some(session)
        }
        None => None,
    };

    match &cli.command {
        Command::Search(args) => search(&dh, args, session.as_ref(), cli.pretty).await,
        Command::Description(args) => description(&dh, args, session.as_ref()).await,
        Command::Tags(args) => tags(&dh, args, session.as_ref(), cli.pretty).await,
        Command::Repository(args) => repository(&dh, args, session.as_ref()).await,
    }
}

async fn search(
    dh: &DockerHubClient,
    args: &SearchArgs,
    session: Option<&Session>,
    pretty: bool,
) -> anyhow::Result<ExitCode> {
    let mut page = dh.search(&args.query, 1, session).await?;
    if args.count {
        println!("{}", page.count);
        return Ok(ExitCode::SUCCESS);
    }

    tracing::info!(query = %args.query, results = page.count, "searching the docker hub");
    print!("{}", output::search_page(1, &page, pretty));

    for number in 2..=args.number {
        if !page.has_next {
            break;
        }
        page = dh.search(&args.query, number, session).await?;
        print!("{}", output::search_page(number, &page, pretty));
    }

    Ok(ExitCode::SUCCESS)
}

async fn description(
    dh: &DockerHubClient,
    args: &DescriptionArgs,
    session: Option<&Session>,
) -> anyhow::Result<ExitCode> {
    if args.set.is_some() {
        bail!("setting the repository description is not supported");
    }

    let repo: RepositoryRef = args.repository.parse()?;
    if args.full {
        // `--full` prints the short and then the long description
        let repository = dh.get_repository(&repo, session).await?;
        println!("{}", repository.description.unwrap_or_default());
        println!();
        println!("{}", repository.full_description.unwrap_or_default());
    } else {
        println!("{}", dh.get_description(&repo, args.long, session).await?);
    }

    Ok(ExitCode::SUCCESS)
}

async fn tags(
    dh: &DockerHubClient,
    args: &TagsArgs,
    session: Option<&Session>,
    pretty: bool,
) -> anyhow::Result<ExitCode> {
    let repo: RepositoryRef = args.repository.parse()?;

    if args.remove {
        let policy = args.policy()?;
        return remove(dh, &repo, &policy, args.answer(), session, pretty).await;
    }

    if let Some(tag) = &args.tag {
        let details = dh.get_tag(&repo, tag, session).await?;
        print!("{}", output::tag_details(&repo, &details));
        return Ok(ExitCode::SUCCESS);
    }

    if args.count {
        let page = dh.list_tags_page(&repo, None, session).await?;
        let count = match page.count {
            Some(count) => count,
            None => pagination::collect_tags(dh, &repo, session).await?.len(),
        };
        println!("{count}");
        return Ok(ExitCode::SUCCESS);
    }

    let stream = pagination::iterate(dh, &repo, session);
    let tags = match args.number {
        // Only the pages holding the first `n` tags are fetched
        Some(n) => stream.take(n).try_collect::<Vec<_>>().await?,
        None => stream.try_collect::<Vec<_>>().await?,
    };

    if pretty {
        print!("{}", output::tags_pretty(&repo, &tags));
    } else {
        println!("{}", output::tags_plain(&tags, &args.delim));
    }

    Ok(ExitCode::SUCCESS)
}

async fn remove<A>(
    api: &A,
    repo: &RepositoryRef,
    policy: &RemovalPolicy,
    answer: Option<bool>,
    session: Option<&Session>,
    pretty: bool,
) -> anyhow::Result<ExitCode>
where
    A: RegistryApi + ?Sized,
{
    let mut prompt_error = None;
    let run = removal::execute_confirmed(api, policy, repo, session, |targets| {
        confirm(repo, targets, answer).unwrap_or_else(|err| {
            prompt_error = Some(err);
            false
        })
    })
    .await?;
    if let Some(err) = prompt_error {
        return Err(err);
    }

    match &run {
        RemovalRun::NothingToRemove => println!("There are no tags to be removed"),
        RemovalRun::Declined(_) => println!("Operation aborted"),
        RemovalRun::Completed(summary) => {
            print!("{}", output::removal_report(repo, summary, pretty))
        }
    }

    Ok(exit_code(&run))
}

fn exit_code(run: &RemovalRun) -> ExitCode {
    if run.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Shows the tags about to be removed and asks for a `[y/N]` confirmation
///
/// Without a terminal to ask on, and without `--assumeyes`, the answer is no.
fn confirm(repo: &RepositoryRef, targets: &[String], answer: Option<bool>) -> anyhow::Result<bool> {
    print!("{}", output::removal_plan(repo, targets));

    if let Some(answer) = answer {
        println!("Is this okay? [y/N]: {}", if answer { "y" } else { "N" });
        return Ok(answer);
    }

    if !std::io::stdin().is_terminal() {
        println!("Is this okay? [y/N]: N (not a terminal, use --assumeyes)");
        return Ok(false);
    }

    Confirm::new()
        .with_prompt("Is this okay?")
        .default(false)
        .interact()
        .context("failed reading the confirmation")
}

async fn repository(
    dh: &DockerHubClient,
    args: &RepositoryArgs,
    session: Option<&Session>,
) -> anyhow::Result<ExitCode> {
    let repo: RepositoryRef = args.repository.parse()?;

    if args.size {
        let tags = pagination::collect_tags(dh, &repo, session).await?;
        let total: u64 = tags.iter().map(|t| t.size_bytes).sum();
        println!("{}", output::size_mb(total));
        return Ok(ExitCode::SUCCESS);
    }

    let repository = dh.get_repository(&repo, session).await?;
    println!("Docker Hub remote repository: {repo}");
    println!("  description  : {}", repository.description.as_deref().unwrap_or("-"));
    println!("  stars        : {}", repository.star_count);
    println!("  pulls        : {}", repository.pull_count);
    println!("  private      : {}", repository.is_private);
    if let Some(updated) = repository.last_updated {
        println!("  last updated : {}", updated.format("%Y-%m-%d"));
    }
    if let Some(size) = repository.storage_size {
        println!("  storage size : {}", output::size_mb(size));
    }

    Ok(ExitCode::SUCCESS)
}
