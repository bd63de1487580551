mod auth;
mod health_check;
mod rewards;
mod users;

pub use auth::{login, logout, refresh, register};
pub use health_check::health_check;
pub use rewards::{
    complete_task, redeem_referrer, reward_routes, secret_task, telegram_task, x_task,
    COMPLETE_TASK_REWARD, SECRET_TASK_REWARD, TELEGRAM_TASK_REWARD, X_TASK_REWARD,
};
pub use users::{delete_user_by_id, get_leaderboard, get_user_by_id};
