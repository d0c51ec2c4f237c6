use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// SQLite database URL.
    #[arg(long, env, default_value = "sqlite://quizhost.db")]
    pub database_url: String,

    /// The address to bind to.
    #[arg(short, long, env, default_value = "127.0.0.1:1414")]
    pub address: String,

    /// Public URL used in emailed links.
    #[arg(long, env, default_value = "http://127.0.0.1:1414")]
    pub base_url: String,

    /// Resend API key. Without it emails are only logged.
    #[arg(long, env)]
    pub resend_api_key: Option<String>,

    /// Sender of outgoing emails.
    #[arg(long, env, default_value = "Quizhost <noreply@quizhost.local>")]
    pub from_email: String,

    #[arg(long, env, default_value_t = 4)]
    pub max_questions_per_quiz: usize,

    #[arg(long, env, default_value_t = 3)]
    pub max_answers_per_question: usize,

    /// Days after sending before an invitation expires.
    #[arg(long, env, default_value_t = 3)]
    pub invitation_expiry_days: i64,

    /// Users granted admin rights at startup.
    #[arg(long, env, value_delimiter = ',')]
    pub admin_emails: Vec<String>,

    #[arg(long, env, default_value_t = false)]
    pub secure_cookies: bool,
}

impl Config {
    /// Built-in defaults, ignoring the command line.
    pub fn defaults() -> Self {
        Config::parse_from(["quizhost"])
    }
}
