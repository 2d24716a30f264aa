//! 配置校验模块
//!
//! 校验规则：
//! - dispatcher.thread_name 非空
//! - subscription 的 topic / action 非空
//! - transactional 仅用于 async 模式
//! - event 的 topic 非空, repeat >= 1

use contracts::{BusBlueprint, ContractError};

/// 校验 BusBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &BusBlueprint) -> Result<(), ContractError> {
    validate_dispatcher(blueprint)?;
    validate_subscriptions(blueprint)?;
    validate_events(blueprint)?;
    Ok(())
}

/// 校验调度器配置
fn validate_dispatcher(blueprint: &BusBlueprint) -> Result<(), ContractError> {
    if blueprint.dispatcher.thread_name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "dispatcher.thread_name",
            "thread_name must not be empty",
        ));
    }
    Ok(())
}

/// 校验订阅
fn validate_subscriptions(blueprint: &BusBlueprint) -> Result<(), ContractError> {
    for (i, sub) in blueprint.subscriptions.iter().enumerate() {
        if sub.topic.is_empty() {
            return Err(ContractError::config_validation(
                format!("subscriptions[{i}].topic"),
                "topic must not be empty",
            ));
        }
        if sub.action.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("subscriptions[{i}].action"),
                "action must not be empty",
            ));
        }
        if sub.transactional && !sub.mode.is_async() {
            return Err(ContractError::config_validation(
                format!("subscriptions[{i}].transactional"),
                format!("transactional requires an async mode, got {:?}", sub.mode),
            ));
        }
    }
    Ok(())
}

/// 校验事件
fn validate_events(blueprint: &BusBlueprint) -> Result<(), ContractError> {
    for (i, event) in blueprint.events.iter().enumerate() {
        if event.topic.is_empty() {
            return Err(ContractError::config_validation(
                format!("events[{i}].topic"),
                "topic must not be empty",
            ));
        }
        if event.repeat == 0 {
            return Err(ContractError::config_validation(
                format!("events[{i}].repeat"),
                "repeat must be >= 1",
            ));
        }
    }
    Ok(())
}
