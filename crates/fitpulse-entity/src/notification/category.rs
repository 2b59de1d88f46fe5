//! Notification type and related-entity enumerations.

use std::fmt;
use std::str::FromStr;

use fitpulse_core::AppError;
use serde::{Deserialize, Serialize};

use super::status::NotificationPriority;

/// Closed set of reminder categories the engine schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// A planned workout is coming up.
    WorkoutReminder,
    /// A goal was reached.
    GoalAchievement,
    /// A goal deadline is close.
    GoalDeadlineApproaching,
    /// Daily motivational nudge.
    DailyMotivation,
    /// A step-count milestone was crossed.
    StepMilestone,
    /// Weekly progress summary.
    WeeklyProgress,
    /// Meal logging reminder.
    NutritionReminder,
    /// Water intake reminder.
    HydrationReminder,
    /// Scheduled rest day.
    RestDayReminder,
    /// An achievement was unlocked.
    AchievementUnlocked,
    /// Workout streak update.
    WorkoutStreak,
    /// Re-engagement prompt for inactive users.
    InactiveUserEngagement,
}

impl NotificationType {
    /// Every variant, in declaration order.
    pub const ALL: [NotificationType; 12] = [
        Self::WorkoutReminder,
        Self::GoalAchievement,
        Self::GoalDeadlineApproaching,
        Self::DailyMotivation,
        Self::StepMilestone,
        Self::WeeklyProgress,
        Self::NutritionReminder,
        Self::HydrationReminder,
        Self::RestDayReminder,
        Self::AchievementUnlocked,
        Self::WorkoutStreak,
        Self::InactiveUserEngagement,
    ];

    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkoutReminder => "workout_reminder",
            Self::GoalAchievement => "goal_achievement",
            Self::GoalDeadlineApproaching => "goal_deadline_approaching",
            Self::DailyMotivation => "daily_motivation",
            Self::StepMilestone => "step_milestone",
            Self::WeeklyProgress => "weekly_progress",
            Self::NutritionReminder => "nutrition_reminder",
            Self::HydrationReminder => "hydration_reminder",
            Self::RestDayReminder => "rest_day_reminder",
            Self::AchievementUnlocked => "achievement_unlocked",
            Self::WorkoutStreak => "workout_streak",
            Self::InactiveUserEngagement => "inactive_user_engagement",
        }
    }

    /// Logical delivery channel notifications of this type are posted to.
    pub fn default_channel(&self) -> &'static str {
        match self {
            Self::WorkoutReminder | Self::RestDayReminder => "workout_reminders",
            Self::GoalAchievement | Self::GoalDeadlineApproaching => "goal_updates",
            Self::DailyMotivation => "motivation",
            Self::NutritionReminder | Self::HydrationReminder => "health_tracking",
            Self::StepMilestone | Self::AchievementUnlocked | Self::WorkoutStreak => {
                "achievements"
            }
            Self::WeeklyProgress | Self::InactiveUserEngagement => "engagement",
        }
    }

    /// Priority assigned when the creator does not pick one.
    pub fn default_priority(&self) -> NotificationPriority {
        match self {
            Self::WorkoutReminder
            | Self::GoalAchievement
            | Self::GoalDeadlineApproaching
            | Self::AchievementUnlocked => NotificationPriority::High,
            Self::HydrationReminder | Self::RestDayReminder | Self::InactiveUserEngagement => {
                NotificationPriority::Low
            }
            _ => NotificationPriority::Default,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Invalid notification type: '{s}'")))
    }
}

/// Kind of business object a notification was scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelatedEntityType {
    /// A user goal.
    Goal,
    /// A planned or logged workout.
    Workout,
    /// A tracked habit.
    Habit,
    /// A food log entry.
    FoodLog,
    /// A daily step goal.
    StepGoal,
    /// An achievement.
    Achievement,
    /// Anything else.
    Other,
}

impl RelatedEntityType {
    /// Return the entity type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Goal => "goal",
            Self::Workout => "workout",
            Self::Habit => "habit",
            Self::FoodLog => "food_log",
            Self::StepGoal => "step_goal",
            Self::Achievement => "achievement",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RelatedEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelatedEntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goal" => Ok(Self::Goal),
            "workout" => Ok(Self::Workout),
            "habit" => Ok(Self::Habit),
            "food_log" => Ok(Self::FoodLog),
            "step_goal" => Ok(Self::StepGoal),
            "achievement" => Ok(Self::Achievement),
            "other" => Ok(Self::Other),
            _ => Err(AppError::validation(format!(
                "Invalid related entity type: '{s}'"
            ))),
        }
    }
}
